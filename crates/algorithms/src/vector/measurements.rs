//! Geometric measurements

use geo::{Area as GeoArea, Geometry};

/// Planar area of a geometry.
///
/// Returns unsigned area in CRS units squared, so square metres for a
/// projected CRS. Holes are subtracted. Non-areal geometries measure 0.
pub fn area(geom: &Geometry<f64>) -> f64 {
    match geom {
        Geometry::Polygon(p) => p.unsigned_area(),
        Geometry::MultiPolygon(mp) => mp.unsigned_area(),
        Geometry::Rect(r) => r.unsigned_area(),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{LineString, MultiPolygon, Polygon};

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> LineString<f64> {
        LineString::from(vec![(x0, y0), (x0, y1), (x1, y1), (x1, y0), (x0, y0)])
    }

    #[test]
    fn test_area_square() {
        let a = area(&Geometry::Polygon(Polygon::new(rect(0.0, 0.0, 10.0, 10.0), vec![])));
        assert!((a - 100.0).abs() < 1e-10);
    }

    #[test]
    fn test_area_subtracts_holes() {
        let poly = Polygon::new(rect(0.0, 0.0, 10.0, 10.0), vec![rect(2.0, 2.0, 8.0, 8.0)]);
        assert!((area(&Geometry::Polygon(poly)) - 64.0).abs() < 1e-10);
    }

    #[test]
    fn test_area_multipolygon() {
        let mp = MultiPolygon::new(vec![
            Polygon::new(rect(0.0, 0.0, 10.0, 10.0), vec![]),
            Polygon::new(rect(20.0, 0.0, 25.0, 4.0), vec![]),
        ]);
        assert!((area(&Geometry::MultiPolygon(mp)) - 120.0).abs() < 1e-10);
    }

    #[test]
    fn test_area_non_polygon() {
        let line = Geometry::LineString(LineString::from(vec![(0.0, 0.0), (10.0, 10.0)]));
        assert_eq!(area(&line), 0.0);
    }
}
