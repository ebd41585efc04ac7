//! Multi-band source rasters

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use ndarray::{Array2, Array3, Axis};

/// An ordered set of bands sharing one grid.
///
/// Bands are addressed with 1-based indices, matching how sensors and GIS
/// tools number them (band 8 is NIR on a Sentinel-2 stack).
#[derive(Debug, Clone)]
pub struct BandStack<T: RasterElement> {
    /// Band data as (band, row, col)
    data: Array3<T>,
    transform: GeoTransform,
    crs: Option<CRS>,
    nodata: Option<T>,
}

impl<T: RasterElement> BandStack<T> {
    /// Create a stack from a (band, row, col) array
    pub fn from_array(data: Array3<T>) -> Self {
        Self {
            data,
            transform: GeoTransform::default(),
            crs: None,
            nodata: None,
        }
    }

    /// Create a stack from individual bands. All bands must share a shape;
    /// grid metadata is taken from the first band.
    pub fn from_bands(bands: &[Raster<T>]) -> Result<Self> {
        let first = bands.first().ok_or(Error::InvalidDimensions {
            width: 0,
            height: 0,
        })?;
        for band in &bands[1..] {
            first.check_same_shape(band)?;
        }

        let views: Vec<_> = bands.iter().map(|b| b.view()).collect();
        let data = ndarray::stack(Axis(0), &views).map_err(|e| Error::Other(e.to_string()))?;

        Ok(Self {
            data,
            transform: *first.transform(),
            crs: first.crs().cloned(),
            nodata: first.nodata(),
        })
    }

    /// Number of bands
    pub fn band_count(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.data.len_of(Axis(1))
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.data.len_of(Axis(2))
    }

    /// Extract one band (1-based) as a standalone raster with the stack's
    /// transform, CRS and no-data value.
    pub fn band(&self, index: usize) -> Result<Raster<T>> {
        let count = self.band_count();
        if index == 0 || index > count {
            return Err(Error::BandOutOfRange { band: index, count });
        }

        let data: Array2<T> = self.data.index_axis(Axis(0), index - 1).to_owned();
        let mut raster = Raster::from_array(data);
        raster.set_transform(self.transform);
        raster.set_crs(self.crs.clone());
        raster.set_nodata(self.nodata);
        Ok(raster)
    }

    /// Band data as a (band, row, col) array
    pub fn data(&self) -> &Array3<T> {
        &self.data
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    pub fn set_crs(&mut self, crs: Option<CRS>) {
        self.crs = crs;
    }

    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    pub fn set_nodata(&mut self, nodata: Option<T>) {
        self.nodata = nodata;
    }

    /// Cell size (assumes square cells)
    pub fn cell_size(&self) -> f64 {
        self.transform.cell_size()
    }

    /// Geographic bounds (min_x, min_y, max_x, max_y)
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        self.transform.bounds(self.cols(), self.rows())
    }
}
