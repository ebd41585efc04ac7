//! Polygon shapefile reading and writing (without GDAL dependency)
//!
//! Uses the `shapefile` crate for the `.shp`/`.shx` geometry and its bundled
//! `dbase` crate for the `.dbf` attribute table. Integer fields are stored as
//! `N(10,0)` and double fields as `N(24,15)`. The `.prj` carries the
//! collection CRS when it can be expressed as WKT.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::io::{ensure_writable, ShapefileOptions, SHAPEFILE_COMPONENTS};
use crate::vector::{AttributeValue, Feature, FeatureCollection, FieldDef, FieldType};
use geo::Contains;
use geo_types::{Coord, Geometry, LineString, MultiPolygon, Polygon};
use shapefile::dbase::{self, FieldName, FieldValue, Record, TableWriterBuilder};
use shapefile::{Point, PolygonRing, Shape};
use std::fs;
use std::path::Path;
use tracing::warn;

/// Numeric field layout: (width, decimals)
const INTEGER_LAYOUT: (u8, u8) = (10, 0);
const DOUBLE_LAYOUT: (u8, u8) = (24, 15);

/// Write a polygon feature collection as a shapefile.
///
/// Ring orientation is normalized by the writer (exteriors clockwise).
/// Every feature must carry a polygon or multipolygon geometry.
pub fn write_shapefile<P: AsRef<Path>>(
    features: &FeatureCollection,
    path: P,
    options: Option<ShapefileOptions>,
) -> Result<()> {
    let opts = options.unwrap_or_default();
    let path = path.as_ref();
    for ext in SHAPEFILE_COMPONENTS {
        ensure_writable(&path.with_extension(ext), opts.overwrite)?;
    }

    let shapes = features
        .iter()
        .map(to_shape)
        .collect::<Result<Vec<_>>>()?;

    {
        let mut writer = shapefile::Writer::from_path(path.with_extension("shp"), table_builder(features.fields())?)?;
        for (shape, feature) in shapes.iter().zip(features.iter()) {
            writer.write_shape_and_record(shape, &to_record(feature, features.fields()))?;
        }
    }

    write_prj(features.crs(), &path.with_extension("prj"))
}

fn table_builder(fields: &[FieldDef]) -> Result<TableWriterBuilder> {
    let mut builder = TableWriterBuilder::new();
    for field in fields {
        let name = FieldName::try_from(field.name.as_str()).map_err(|e| {
            Error::Shapefile(format!("invalid dBase field name {:?}: {:?}", field.name, e))
        })?;
        let (width, decimals) = match field.kind {
            FieldType::Integer => INTEGER_LAYOUT,
            FieldType::Double => DOUBLE_LAYOUT,
        };
        builder = builder.add_numeric_field(name, width, decimals);
    }
    Ok(builder)
}

fn to_record(feature: &Feature, fields: &[FieldDef]) -> Record {
    let mut record = Record::default();
    for field in fields {
        let value = feature.get_property(&field.name).and_then(AttributeValue::as_f64);
        record.insert(field.name.clone(), FieldValue::Numeric(value));
    }
    record
}

fn ring_points(ring: &LineString<f64>) -> Vec<Point> {
    ring.coords().map(|c| Point::new(c.x, c.y)).collect()
}

fn to_shape(feature: &Feature) -> Result<shapefile::Polygon> {
    let polygons = match &feature.geometry {
        Some(Geometry::Polygon(p)) => vec![p.clone()],
        Some(Geometry::MultiPolygon(mp)) => mp.0.clone(),
        Some(Geometry::Rect(r)) => vec![r.to_polygon()],
        Some(_) => {
            return Err(Error::Shapefile(
                "only polygon geometries can be written".to_string(),
            ))
        }
        None => {
            return Err(Error::Shapefile(
                "features without geometry cannot be written".to_string(),
            ))
        }
    };

    let rings = polygons
        .iter()
        .flat_map(|p| {
            std::iter::once(PolygonRing::Outer(ring_points(p.exterior())))
                .chain(p.interiors().iter().map(|hole| PolygonRing::Inner(ring_points(hole))))
        })
        .collect();
    Ok(shapefile::Polygon::with_rings(rings))
}

fn write_prj(crs: Option<&CRS>, prj: &Path) -> Result<()> {
    match crs.and_then(CRS::prj_wkt) {
        Some(wkt) => fs::write(prj, wkt)?,
        None => {
            if let Some(crs) = crs {
                warn!("No WKT known for {}, {} not written", crs, prj.display());
            }
            if prj.exists() {
                fs::remove_file(prj)?;
            }
        }
    }
    Ok(())
}

/// Read a polygon shapefile with numeric attributes.
///
/// Character, date and logical fields are skipped. Numeric fields come
/// back as [`FieldType::Double`] unless the file declares a binary integer.
pub fn read_shapefile<P: AsRef<Path>>(path: P) -> Result<FeatureCollection> {
    let path = path.as_ref();
    let crs = match fs::read_to_string(path.with_extension("prj")) {
        Ok(wkt) => Some(CRS::from_wkt(wkt.trim())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => return Err(e.into()),
    };

    let table = dbase::Reader::from_path(path.with_extension("dbf"))?;
    let fields: Vec<FieldDef> = table
        .fields()
        .iter()
        .filter_map(|info| {
            let kind = match info.field_type() {
                dbase::FieldType::Integer => FieldType::Integer,
                dbase::FieldType::Numeric
                | dbase::FieldType::Float
                | dbase::FieldType::Double
                | dbase::FieldType::Currency => FieldType::Double,
                _ => return None,
            };
            Some(FieldDef {
                name: info.name().to_string(),
                kind,
            })
        })
        .collect();

    let mut collection = FeatureCollection::with_crs(crs);
    for field in &fields {
        collection.add_field(field.name.clone(), field.kind);
    }

    for (shape, record) in shapefile::read(path.with_extension("shp"))? {
        let mut feature = match shape {
            Shape::Polygon(polygon) => Feature::new(assemble_polygons(polygon.rings())),
            Shape::NullShape => Feature::empty(),
            other => {
                return Err(Error::Shapefile(format!(
                    "unsupported shape type {:?}",
                    other.shapetype()
                )))
            }
        };
        for field in &fields {
            feature.set_property(field.name.clone(), attribute(record.get(&field.name)));
        }
        collection.push(feature);
    }
    Ok(collection)
}

fn attribute(value: Option<&FieldValue>) -> AttributeValue {
    match value {
        Some(FieldValue::Numeric(Some(v))) | Some(FieldValue::Double(v)) | Some(FieldValue::Currency(v)) => {
            AttributeValue::Float(*v)
        }
        Some(FieldValue::Float(Some(v))) => AttributeValue::Float(f64::from(*v)),
        Some(FieldValue::Integer(v)) => AttributeValue::Int(i64::from(*v)),
        _ => AttributeValue::Null,
    }
}

fn to_line_string(points: &[Point]) -> LineString<f64> {
    points.iter().map(|p| Coord { x: p.x, y: p.y }).collect()
}

/// Group rings into polygons: every outer ring starts a polygon and inner
/// rings become holes of the outer ring that contains them.
fn assemble_polygons(rings: &[PolygonRing<Point>]) -> Geometry<f64> {
    let mut polygons: Vec<(LineString<f64>, Vec<LineString<f64>>)> = Vec::new();
    let mut holes = Vec::new();
    for ring in rings {
        match ring {
            PolygonRing::Outer(points) => polygons.push((to_line_string(points), Vec::new())),
            PolygonRing::Inner(points) => holes.push(to_line_string(points)),
        }
    }

    for hole in holes {
        let owner = polygons
            .iter()
            .rposition(|(exterior, _)| Polygon::new(exterior.clone(), vec![]).contains(&hole));
        match owner.or(polygons.len().checked_sub(1)) {
            Some(i) => polygons[i].1.push(hole),
            // A lone inner ring is taken as an exterior
            None => polygons.push((hole, Vec::new())),
        }
    }

    let mut polygons: Vec<Polygon<f64>> = polygons
        .into_iter()
        .map(|(exterior, interiors)| Polygon::new(exterior, interiors))
        .collect();
    if polygons.len() == 1 {
        Geometry::Polygon(polygons.remove(0))
    } else {
        Geometry::MultiPolygon(MultiPolygon::new(polygons))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Area, Winding};
    use geo_types::polygon;
    use tempfile::tempdir;

    fn square_with_hole() -> Polygon<f64> {
        polygon!(
            exterior: [
                (x: 0.0, y: 0.0),
                (x: 60.0, y: 0.0),
                (x: 60.0, y: 60.0),
                (x: 0.0, y: 60.0),
            ],
            interiors: [
                [
                    (x: 20.0, y: 20.0),
                    (x: 40.0, y: 20.0),
                    (x: 40.0, y: 40.0),
                    (x: 20.0, y: 40.0),
                ],
            ],
        )
    }

    fn layer(crs: CRS) -> FeatureCollection {
        let mut fc = FeatureCollection::with_crs(Some(crs));
        fc.add_field("Id", FieldType::Integer);
        fc.add_field("gridcode", FieldType::Integer);
        fc.add_field("AREA_M2", FieldType::Double);

        let polygon = square_with_hole();
        let mut feature = Feature::new(Geometry::Polygon(polygon.clone()));
        feature.set_property("Id", AttributeValue::Int(1));
        feature.set_property("gridcode", AttributeValue::Int(1));
        feature.set_property("AREA_M2", AttributeValue::Float(polygon.unsigned_area()));
        fc.push(feature);
        fc
    }

    #[test]
    fn test_write_then_read_polygon_with_hole() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("NDRE_pastizales.shp");
        write_shapefile(&layer(CRS::from_epsg(32719)), &path, None).unwrap();

        for ext in SHAPEFILE_COMPONENTS {
            assert!(path.with_extension(ext).exists(), "missing .{}", ext);
        }

        let loaded = read_shapefile(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        let names: Vec<_> = loaded.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["Id", "gridcode", "AREA_M2"]);

        let feature = &loaded.features[0];
        assert_eq!(feature.get_f64("Id"), Some(1.0));
        assert_eq!(feature.get_f64("AREA_M2"), Some(3200.0));
        match feature.geometry.as_ref().unwrap() {
            Geometry::Polygon(p) => {
                assert_eq!(p.interiors().len(), 1);
                assert!(p.exterior().is_cw());
                assert!(!p.interiors()[0].is_cw());
                assert_eq!(p.unsigned_area(), 3200.0);
            }
            other => panic!("expected polygon, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_layer() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.shp");
        let mut fc = FeatureCollection::new();
        fc.add_field("AREA_M2", FieldType::Double);
        write_shapefile(&fc, &path, None).unwrap();

        assert!(!path.with_extension("prj").exists());
        let loaded = read_shapefile(&path).unwrap();
        assert!(loaded.is_empty());
        assert_eq!(loaded.fields().len(), 1);
    }

    #[test]
    fn test_overwrite_disabled() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("layer.shp");
        write_shapefile(&layer(CRS::from_epsg(32719)), &path, None).unwrap();

        let result = write_shapefile(
            &layer(CRS::from_epsg(32719)),
            &path,
            Some(ShapefileOptions { overwrite: false }),
        );
        assert!(matches!(result, Err(Error::OutputExists(_))));
    }

    #[test]
    fn test_crs_without_wkt_leaves_no_stale_prj() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("layer.shp");
        write_shapefile(&layer(CRS::from_epsg(32719)), &path, None).unwrap();
        assert!(path.with_extension("prj").exists());

        // Lambert-93 has no built-in WKT
        write_shapefile(&layer(CRS::from_epsg(2154)), &path, None).unwrap();
        assert!(!path.with_extension("prj").exists());
        assert_eq!(read_shapefile(&path).unwrap().len(), 1);
    }

    #[test]
    fn test_feature_without_geometry_is_rejected() {
        let dir = tempdir().unwrap();
        let mut fc = FeatureCollection::new();
        fc.push(Feature::empty());
        let result = write_shapefile(&fc, dir.path().join("layer.shp"), None);
        assert!(matches!(result, Err(Error::Shapefile(_))));
    }

    #[test]
    fn test_truncated_table_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("layer.shp");
        write_shapefile(&layer(CRS::from_epsg(32719)), &path, None).unwrap();

        // Header claims 200 bytes of field descriptors but the file ends at 33
        let mut dbf = vec![0u8; 33];
        dbf[0] = 0x03;
        dbf[8] = 200;
        dbf[32] = 0x0D;
        fs::write(path.with_extension("dbf"), dbf).unwrap();

        assert!(read_shapefile(&path).is_err());
    }

    #[test]
    fn test_lone_inner_ring_is_exterior() {
        let ring = PolygonRing::Inner(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 0.0),
        ]);
        match assemble_polygons(&[ring]) {
            Geometry::Polygon(p) => assert!(p.interiors().is_empty()),
            other => panic!("expected polygon, got {:?}", other),
        }
    }
}
