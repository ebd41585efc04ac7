//! Raster reclassification with remap tables
//!
//! A remap table is an ordered list of contiguous value ranges, each mapped
//! to an integer class. Ranges are half-open `[low, high)` except the last,
//! which also includes its upper bound.

use crate::maybe_rayon::map_cells;
use grassmap_core::raster::Raster;
use grassmap_core::{Error, Result};

/// Class value for cells outside every range (and the output no-data value)
pub const CLASS_NODATA: u8 = 0;

/// Fixed NDRE cut points between the six vigour classes
pub const NDRE_BREAKS: [f64; 5] = [0.41, 0.45, 0.50, 0.55, 0.59];

/// A reclassification entry mapping an input range to an output class
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RemapRange {
    /// Lower bound (inclusive)
    pub low: f64,
    /// Upper bound (exclusive, except for the last range)
    pub high: f64,
    /// Output class
    pub value: u8,
}

impl RemapRange {
    pub fn new(low: f64, high: f64, value: u8) -> Self {
        Self { low, high, value }
    }
}

/// Validated, contiguous list of remap ranges
#[derive(Debug, Clone, PartialEq)]
pub struct RemapTable {
    ranges: Vec<RemapRange>,
}

fn invalid(value: String, reason: &str) -> Error {
    Error::InvalidParameter {
        name: "remap_table",
        value,
        reason: reason.to_string(),
    }
}

impl RemapTable {
    /// Build a table, checking that ranges are ordered, contiguous and map
    /// to classes other than [`CLASS_NODATA`].
    pub fn new(ranges: Vec<RemapRange>) -> Result<Self> {
        if ranges.is_empty() {
            return Err(invalid("[]".into(), "table has no ranges"));
        }
        for r in &ranges {
            if !(r.low <= r.high) {
                return Err(invalid(format!("{:?}", r), "low bound exceeds high bound"));
            }
            if r.value == CLASS_NODATA {
                return Err(invalid(format!("{:?}", r), "class 0 is reserved for no-data"));
            }
        }
        for pair in ranges.windows(2) {
            if pair[0].high != pair[1].low {
                return Err(invalid(
                    format!("{:?} / {:?}", pair[0], pair[1]),
                    "ranges must be contiguous",
                ));
            }
        }
        Ok(Self { ranges })
    }

    /// The six NDRE classes over the observed `[min, max]`:
    ///
    /// ```text
    /// [min, 0.41) -> 1   [0.41, 0.45) -> 2   [0.45, 0.50) -> 3
    /// [0.50, 0.55) -> 4  [0.55, 0.59) -> 5   [0.59, max]  -> 6
    /// ```
    ///
    /// When `min` or `max` falls inside the cut points the outer range
    /// collapses to an empty interval instead of inverting.
    pub fn ndre_classes(min: f64, max: f64) -> Result<Self> {
        if !(min <= max) {
            return Err(invalid(format!("[{}, {}]", min, max), "min exceeds max"));
        }
        let first = NDRE_BREAKS[0];
        let last = NDRE_BREAKS[NDRE_BREAKS.len() - 1];

        let mut bounds = Vec::with_capacity(NDRE_BREAKS.len() + 2);
        bounds.push(min.min(first));
        bounds.extend_from_slice(&NDRE_BREAKS);
        bounds.push(max.max(last));

        let ranges = bounds
            .windows(2)
            .zip(1u8..)
            .map(|(w, class)| RemapRange::new(w[0], w[1], class))
            .collect();
        Self::new(ranges)
    }

    pub fn ranges(&self) -> &[RemapRange] {
        &self.ranges
    }

    /// Class of `value`, `None` when it falls outside every range
    pub fn lookup(&self, value: f64) -> Option<u8> {
        let last = self.ranges.len() - 1;
        self.ranges
            .iter()
            .enumerate()
            .find(|(i, r)| value >= r.low && (value < r.high || (*i == last && value <= r.high)))
            .map(|(_, r)| r.value)
    }
}

/// Reclassify raster values with a remap table.
///
/// No-data cells and cells outside every range become [`CLASS_NODATA`].
///
/// # Example
/// ```ignore
/// let stats = band_statistics(&ndre, NumericLocale::from_env())?;
/// let table = RemapTable::ndre_classes(stats.min, stats.max)?;
/// let classes = reclassify(&ndre, &table)?;
/// ```
pub fn reclassify(raster: &Raster<f64>, table: &RemapTable) -> Result<Raster<u8>> {
    map_cells(raster, Some(CLASS_NODATA), |v| {
        v.and_then(|v| table.lookup(v)).unwrap_or(CLASS_NODATA)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use grassmap_core::GeoTransform;

    fn make_ndre_raster() -> Raster<f64> {
        let values = vec![
            0.30, 0.40, 0.41, 0.44, 0.45,
            0.49, 0.50, 0.54, 0.55, 0.58,
            0.59, 0.65, 0.70, f64::NAN, 0.52,
        ];
        let mut r = Raster::from_vec(values, 3, 5).unwrap();
        r.set_transform(GeoTransform::new(0.0, 3.0, 1.0, -1.0));
        r.set_nodata(Some(f64::NAN));
        r
    }

    #[test]
    fn test_ndre_table_bounds() {
        let table = RemapTable::ndre_classes(0.30, 0.70).unwrap();
        let ranges = table.ranges();
        assert_eq!(ranges.len(), 6);
        assert_eq!(ranges[0], RemapRange::new(0.30, 0.41, 1));
        assert_eq!(ranges[3], RemapRange::new(0.50, 0.55, 4));
        assert_eq!(ranges[5], RemapRange::new(0.59, 0.70, 6));
        assert_eq!(table.lookup(0.50), Some(4));
    }

    #[test]
    fn test_reclassify_classes() {
        let raster = make_ndre_raster();
        let table = RemapTable::ndre_classes(0.30, 0.70).unwrap();
        let classes = reclassify(&raster, &table).unwrap();

        let expected: Vec<u8> = vec![1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 6, 0, 4];
        assert_eq!(classes.data().iter().copied().collect::<Vec<_>>(), expected);
        assert_eq!(classes.nodata(), Some(CLASS_NODATA));
        assert_eq!(classes.transform(), raster.transform());
    }

    #[test]
    fn test_classes_monotonic_in_value() {
        let table = RemapTable::ndre_classes(-0.2, 0.9).unwrap();
        let mut previous = 0;
        for step in 0..110 {
            let v = -0.2 + step as f64 * 0.01;
            let class = table.lookup(v).unwrap();
            assert!((1..=6).contains(&class));
            assert!(class >= previous);
            previous = class;
        }
    }

    #[test]
    fn test_narrow_observed_range_collapses_outer_ranges() {
        let table = RemapTable::ndre_classes(0.47, 0.52).unwrap();
        let ranges = table.ranges();
        assert_relative_eq!(ranges[0].low, 0.41);
        assert_relative_eq!(ranges[0].high, 0.41);
        assert_relative_eq!(ranges[5].low, 0.59);
        assert_relative_eq!(ranges[5].high, 0.59);
        assert_eq!(table.lookup(0.47), Some(3));
        assert_eq!(table.lookup(0.40), None);
    }

    #[test]
    fn test_invalid_tables() {
        assert!(RemapTable::new(vec![]).is_err());
        assert!(RemapTable::new(vec![RemapRange::new(0.5, 0.4, 1)]).is_err());
        assert!(RemapTable::new(vec![RemapRange::new(0.0, 1.0, CLASS_NODATA)]).is_err());
        assert!(RemapTable::new(vec![
            RemapRange::new(0.0, 0.4, 1),
            RemapRange::new(0.5, 1.0, 2),
        ])
        .is_err());
        assert!(RemapTable::ndre_classes(0.7, 0.3).is_err());
    }

    #[test]
    fn test_last_range_includes_upper_bound() {
        let table = RemapTable::new(vec![
            RemapRange::new(0.0, 0.5, 1),
            RemapRange::new(0.5, 1.0, 2),
        ])
        .unwrap();
        assert_eq!(table.lookup(1.0), Some(2));
        assert_eq!(table.lookup(1.0001), None);
        assert_eq!(table.lookup(-0.1), None);
    }
}
