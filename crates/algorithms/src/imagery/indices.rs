//! Normalized-difference spectral indices
//!
//! All indices operate on single-band rasters (one band per raster) and
//! produce `f64` rasters in [-1, 1] with NaN as no-data.

use crate::maybe_rayon::map_rows;
use grassmap_core::raster::Raster;
use grassmap_core::Result;

/// Spectral indices computed by this module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpectralIndex {
    /// Normalized Difference Vegetation Index
    NDVI,
    /// Normalized Difference Red Edge Index
    NDRE,
    /// Normalized Difference Water Index (McFeeters)
    NDWI,
}

impl SpectralIndex {
    /// Short name, also used as the output file stem
    pub fn name(&self) -> &'static str {
        match self {
            SpectralIndex::NDVI => "NDVI",
            SpectralIndex::NDRE => "NDRE",
            SpectralIndex::NDWI => "NDWI",
        }
    }
}

// ---------------------------------------------------------------------------
// Generic normalized difference
// ---------------------------------------------------------------------------

/// Compute the normalized difference between two bands:
///
/// `(band_a - band_b) / (band_a + band_b)`
///
/// Result is in the range [-1, 1] for non-negative reflectances. Pixels
/// where the sum is zero or either band is nodata are set to NaN.
///
/// # Arguments
/// * `band_a` - Numerator positive band
/// * `band_b` - Numerator negative band
pub fn normalized_difference(band_a: &Raster<f64>, band_b: &Raster<f64>) -> Result<Raster<f64>> {
    band_a.check_same_shape(band_b)?;

    map_rows(band_a, Some(f64::NAN), |row| {
        let a_row = band_a.data().row(row);
        let b_row = band_b.data().row(row);
        a_row
            .iter()
            .zip(b_row.iter())
            .map(|(&a, &b)| {
                if band_a.is_nodata(a) || band_b.is_nodata(b) {
                    return f64::NAN;
                }
                let sum = a + b;
                if sum.abs() < 1e-10 {
                    return f64::NAN;
                }
                (a - b) / sum
            })
            .collect()
    })
}

/// Normalized Difference Vegetation Index
///
/// `NDVI = (NIR - Red) / (NIR + Red)`
///
/// Dense canopy sits above roughly 0.6; water and bare surfaces are near or
/// below zero.
pub fn ndvi(nir: &Raster<f64>, red: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(nir, red)
}

/// Normalized Difference Red Edge Index
///
/// `NDRE = (NIR - RedEdge) / (NIR + RedEdge)`
///
/// More sensitive than NDVI to chlorophyll content in mid-to-dense
/// vegetation, which makes it useful for grassland vigour.
pub fn ndre(nir: &Raster<f64>, red_edge: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(nir, red_edge)
}

/// Normalized Difference Water Index (McFeeters, 1996)
///
/// `NDWI = (Green - NIR) / (Green + NIR)`
///
/// Positive values indicate open water.
pub fn ndwi(green: &Raster<f64>, nir: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(green, nir)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
