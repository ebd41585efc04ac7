//! GeoTIFF and shapefile reading and writing using GDAL

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::io::{ensure_writable, GeoTiffOptions, ShapefileOptions, SHAPEFILE_COMPONENTS};
use crate::raster::{BandStack, GeoTransform, Raster, RasterElement};
use crate::vector::{AttributeValue, Feature, FeatureCollection, FieldType};
use gdal::raster::{Buffer, GdalType, RasterCreationOptions};
use gdal::spatial_ref::SpatialRef;
use gdal::vector::{
    FieldValue, LayerAccess, LayerOptions, OGRFieldType, OGRwkbGeometryType, ToGdal,
};
use gdal::{Dataset, DriverManager};
use ndarray::{Array2, Array3, Axis};
use std::fs;
use std::path::Path;

/// Read one band (1-based, default 1) of a GeoTIFF file into a Raster
///
/// # Example
/// ```ignore
/// let nir: Raster<f64> = read_geotiff("S2_stack.tif", Some(8))?;
/// ```
pub fn read_geotiff<T, P>(path: P, band: Option<usize>) -> Result<Raster<T>>
where
    T: RasterElement + GdalType,
    P: AsRef<Path>,
{
    let dataset = Dataset::open(path.as_ref())?;
    let band_idx = band.unwrap_or(1);
    let count = dataset.raster_count();
    if band_idx == 0 || band_idx > count {
        return Err(Error::BandOutOfRange {
            band: band_idx,
            count,
        });
    }

    let (cols, rows) = dataset.raster_size();
    let rasterband = dataset.rasterband(band_idx)?;
    let buffer = rasterband.read_as::<T>((0, 0), (cols, rows), (cols, rows), None)?;
    let (_, data) = buffer.into_shape_and_vec();

    let mut raster = Raster::from_vec(data, rows, cols)?;
    raster.set_transform(dataset_transform(&dataset));
    raster.set_crs(dataset_crs(&dataset));
    raster.set_nodata(rasterband.no_data_value().and_then(T::from_f64));
    Ok(raster)
}

/// Read every band of a GeoTIFF file
pub fn read_bands<T, P>(path: P) -> Result<BandStack<T>>
where
    T: RasterElement + GdalType,
    P: AsRef<Path>,
{
    let dataset = Dataset::open(path.as_ref())?;
    let (cols, rows) = dataset.raster_size();
    let count = dataset.raster_count();

    let mut data = Array3::<T>::zeros((count, rows, cols));
    let mut nodata = None;
    for (index, mut plane) in data.axis_iter_mut(Axis(0)).enumerate() {
        let band = dataset.rasterband(index + 1)?;
        let buffer = band.read_as::<T>((0, 0), (cols, rows), (cols, rows), None)?;
        let (_, values) = buffer.into_shape_and_vec();
        let values = Array2::from_shape_vec((rows, cols), values)
            .map_err(|e| Error::Other(e.to_string()))?;
        plane.assign(&values);
        if index == 0 {
            nodata = band.no_data_value().and_then(T::from_f64);
        }
    }

    let mut stack = BandStack::from_array(data);
    stack.set_transform(dataset_transform(&dataset));
    stack.set_crs(dataset_crs(&dataset));
    stack.set_nodata(nodata);
    Ok(stack)
}

fn dataset_transform(dataset: &Dataset) -> GeoTransform {
    dataset
        .geo_transform()
        .map(GeoTransform::from_gdal)
        .unwrap_or_default()
}

fn dataset_crs(dataset: &Dataset) -> Option<CRS> {
    crs_of(&dataset.spatial_ref().ok()?)
}

fn crs_of(srs: &SpatialRef) -> Option<CRS> {
    let wkt = srs.to_wkt().ok()?;
    let crs = CRS::from_wkt(wkt);
    Some(match srs.auth_code() {
        Ok(code) if code > 0 => crs.with_epsg(code as u32),
        _ => crs,
    })
}

fn creation_options(opts: &GeoTiffOptions) -> Result<RasterCreationOptions> {
    let mut options = RasterCreationOptions::new();
    options.set_name_value("COMPRESS", &opts.compression)?;
    Ok(options)
}

fn create_dataset<T: GdalType>(
    path: &Path,
    cols: usize,
    rows: usize,
    bands: usize,
    opts: &GeoTiffOptions,
    transform: &GeoTransform,
    crs: Option<&CRS>,
) -> Result<Dataset> {
    ensure_writable(path, opts.overwrite)?;
    let driver = DriverManager::get_driver_by_name("GTiff")?;
    let mut dataset = driver.create_with_band_type_with_options::<T, _>(
        path,
        cols,
        rows,
        bands,
        &creation_options(opts)?,
    )?;

    dataset.set_geo_transform(&transform.to_gdal())?;
    if let Some(srs) = crs.map(spatial_ref).transpose()?.flatten() {
        dataset.set_spatial_ref(&srs)?;
    }
    Ok(dataset)
}

fn spatial_ref(crs: &CRS) -> Result<Option<SpatialRef>> {
    Ok(match (crs.wkt(), crs.epsg()) {
        (Some(wkt), _) => Some(SpatialRef::from_wkt(wkt)?),
        (None, Some(code)) => Some(SpatialRef::from_epsg(code)?),
        (None, None) => None,
    })
}

/// Write a Raster to a GeoTIFF file
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P, options: Option<GeoTiffOptions>) -> Result<()>
where
    T: RasterElement + GdalType,
    P: AsRef<Path>,
{
    let opts = options.unwrap_or_default();
    let (rows, cols) = raster.shape();
    let dataset = create_dataset::<T>(
        path.as_ref(),
        cols,
        rows,
        1,
        &opts,
        raster.transform(),
        raster.crs(),
    )?;

    let mut band = dataset.rasterband(1)?;
    if let Some(nodata) = raster.nodata().and_then(|v| v.to_f64()) {
        band.set_no_data_value(Some(nodata))?;
    }

    let data: Vec<T> = raster.data().iter().copied().collect();
    let mut buffer = Buffer::new((cols, rows), data);
    band.write((0, 0), (cols, rows), &mut buffer)?;
    Ok(())
}

/// Write every band of a stack to one GeoTIFF
pub fn write_bands<T, P>(stack: &BandStack<T>, path: P, options: Option<GeoTiffOptions>) -> Result<()>
where
    T: RasterElement + GdalType,
    P: AsRef<Path>,
{
    let opts = options.unwrap_or_default();
    let (rows, cols) = (stack.rows(), stack.cols());
    let dataset = create_dataset::<T>(
        path.as_ref(),
        cols,
        rows,
        stack.band_count(),
        &opts,
        stack.transform(),
        stack.crs(),
    )?;

    for (index, plane) in stack.data().axis_iter(Axis(0)).enumerate() {
        let mut band = dataset.rasterband(index + 1)?;
        if let Some(nodata) = stack.nodata().and_then(|v| v.to_f64()) {
            band.set_no_data_value(Some(nodata))?;
        }
        let mut buffer = Buffer::new((cols, rows), plane.iter().copied().collect());
        band.write((0, 0), (cols, rows), &mut buffer)?;
    }
    Ok(())
}

/// Write a polygon feature collection through the OGR "ESRI Shapefile" driver
pub fn write_shapefile<P: AsRef<Path>>(
    features: &FeatureCollection,
    path: P,
    options: Option<ShapefileOptions>,
) -> Result<()> {
    let opts = options.unwrap_or_default();
    let path = path.as_ref().with_extension("shp");
    for ext in SHAPEFILE_COMPONENTS {
        let component = path.with_extension(ext);
        ensure_writable(&component, opts.overwrite)?;
        if component.exists() {
            fs::remove_file(&component)?;
        }
    }

    let driver = DriverManager::get_driver_by_name("ESRI Shapefile")?;
    let mut dataset = driver.create_vector_only(&path)?;
    let srs = features.crs().map(spatial_ref).transpose()?.flatten();
    let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or("polygons");
    let mut layer = dataset.create_layer(LayerOptions {
        name,
        srs: srs.as_ref(),
        ty: OGRwkbGeometryType::wkbPolygon,
        ..Default::default()
    })?;

    let definitions: Vec<(&str, OGRFieldType::Type)> = features
        .fields()
        .iter()
        .map(|f| {
            let kind = match f.kind {
                FieldType::Integer => OGRFieldType::OFTInteger64,
                FieldType::Double => OGRFieldType::OFTReal,
            };
            (f.name.as_str(), kind)
        })
        .collect();
    layer.create_defn_fields(&definitions)?;

    for feature in features.iter() {
        let geometry = feature.geometry.as_ref().ok_or_else(|| {
            Error::Shapefile("features without geometry cannot be written".to_string())
        })?;
        let mut names = Vec::new();
        let mut values = Vec::new();
        for field in features.fields() {
            let value = match (field.kind, feature.get_property(&field.name)) {
                (_, None) | (_, Some(AttributeValue::Null)) => continue,
                (FieldType::Integer, Some(v)) => v.as_i64().map(FieldValue::Integer64Value),
                (FieldType::Double, Some(v)) => v.as_f64().map(FieldValue::RealValue),
            };
            let value = value.ok_or_else(|| {
                Error::Shapefile(format!("field {} expects an integer", field.name))
            })?;
            names.push(field.name.as_str());
            values.push(value);
        }
        layer.create_feature_fields(geometry.to_gdal()?, &names, &values)?;
    }
    Ok(())
}

/// Read the first layer of a vector dataset through OGR
pub fn read_shapefile<P: AsRef<Path>>(path: P) -> Result<FeatureCollection> {
    let dataset = Dataset::open(path.as_ref())?;
    let mut layer = dataset.layer(0)?;

    let fields: Vec<(String, FieldType)> = layer
        .defn()
        .fields()
        .filter_map(|field| {
            let kind = match field.field_type() {
                OGRFieldType::OFTInteger | OGRFieldType::OFTInteger64 => FieldType::Integer,
                OGRFieldType::OFTReal => FieldType::Double,
                _ => return None,
            };
            Some((field.name(), kind))
        })
        .collect();

    let mut collection = FeatureCollection::with_crs(layer.spatial_ref().as_ref().and_then(crs_of));
    for (name, kind) in &fields {
        collection.add_field(name.clone(), *kind);
    }

    for ogr_feature in layer.features() {
        let mut feature = match ogr_feature.geometry() {
            Some(geometry) => Feature::new(geometry.to_geo()?),
            None => Feature::empty(),
        };
        for (name, value) in ogr_feature.fields() {
            if !fields.iter().any(|(field, _)| *field == name) {
                continue;
            }
            let value = match value {
                Some(FieldValue::IntegerValue(v)) => AttributeValue::Int(i64::from(v)),
                Some(FieldValue::Integer64Value(v)) => AttributeValue::Int(v),
                Some(FieldValue::RealValue(v)) => AttributeValue::Float(v),
                _ => AttributeValue::Null,
            };
            feature.set_property(name, value);
        }
        collection.push(feature);
    }
    Ok(collection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_read_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ndvi.tif");

        let mut raster: Raster<f64> = Raster::filled(20, 30, 0.5);
        raster.set_transform(GeoTransform::new(300_000.0, 5_000_000.0, 10.0, -10.0));
        raster.set_crs(Some(CRS::from_epsg(32719)));
        raster.set_nodata(Some(f64::NAN));
        raster.set(5, 5, -0.25).unwrap();

        write_geotiff(&raster, &path, None).unwrap();
        let loaded: Raster<f64> = read_geotiff(&path, None).unwrap();

        assert_eq!(loaded.shape(), raster.shape());
        assert_eq!(loaded.get(5, 5).unwrap(), -0.25);
        assert_eq!(loaded.crs().and_then(|c| c.epsg()), Some(32719));
    }

    fn parcel(crs: CRS) -> FeatureCollection {
        let mut fc = FeatureCollection::with_crs(Some(crs));
        fc.add_field("Id", FieldType::Integer);
        fc.add_field("AREA_M2", FieldType::Double);
        let square = geo_types::polygon![
            (x: 0.0, y: 0.0),
            (x: 50.0, y: 0.0),
            (x: 50.0, y: 40.0),
            (x: 0.0, y: 40.0),
        ];
        let mut feature = Feature::new(geo_types::Geometry::Polygon(square));
        feature.set_property("Id", AttributeValue::Int(1));
        feature.set_property("AREA_M2", AttributeValue::Float(2000.0));
        fc.push(feature);
        fc
    }

    #[test]
    fn test_shapefile_keeps_any_epsg() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("parcelas.shp");

        write_shapefile(&parcel(CRS::from_epsg(2154)), &path, None).unwrap();
        assert!(path.with_extension("prj").exists());

        let loaded = read_shapefile(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        let wkt = loaded.crs().and_then(|c| c.wkt()).unwrap();
        assert!(wkt.contains("Lambert"));
        assert_eq!(loaded.features[0].get_property("Id"), Some(&AttributeValue::Int(1)));
        assert_eq!(loaded.features[0].get_f64("AREA_M2"), Some(2000.0));
    }

    #[test]
    fn test_shapefile_overwrite_disabled() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("parcelas.shp");
        write_shapefile(&parcel(CRS::from_epsg(32719)), &path, None).unwrap();

        let result = write_shapefile(
            &parcel(CRS::from_epsg(32719)),
            &path,
            Some(ShapefileOptions { overwrite: false }),
        );
        assert!(matches!(result, Err(Error::OutputExists(_))));
    }
}
