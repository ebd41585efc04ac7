//! Area attribute and minimum-area filtering of polygon features

use crate::vector::measurements::area;
use grassmap_core::vector::{AttributeValue, FeatureCollection, FieldType};
use grassmap_core::{Error, Result};
use tracing::{debug, warn};

/// Area field written by the grassland pipeline
pub const AREA_FIELD: &str = "AREA_M2";

/// Minimum polygon area kept by the grassland pipeline, in square metres
pub const MIN_AREA_M2: f64 = 1600.0;

/// Declare a double field `name` and fill it with each feature's planar area.
///
/// Areas are in CRS units squared. Features without geometry get 0.
pub fn add_area_field(features: &mut FeatureCollection, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidParameter {
            name: "field",
            value: String::new(),
            reason: "field name must not be empty".into(),
        });
    }
    if features.crs().and_then(|crs| crs.is_geographic()) == Some(true) {
        warn!("CRS is geographic: {} holds square degrees, not square metres", name);
    }

    features.add_field(name, FieldType::Double);
    for feature in features.iter_mut() {
        let value = feature.geometry.as_ref().map(area).unwrap_or(0.0);
        feature.set_property(name, AttributeValue::Float(value));
    }
    Ok(())
}

/// Delete features whose `field` value is strictly below `min_value`.
///
/// Features with a null or missing value are deleted too. Returns the number
/// of deleted features.
pub fn remove_smaller_than(features: &mut FeatureCollection, field: &str, min_value: f64) -> Result<usize> {
    if !features.has_field(field) {
        return Err(Error::InvalidParameter {
            name: "field",
            value: field.to_string(),
            reason: "no such field in the feature collection".into(),
        });
    }

    let removed = features.retain(|f| f.get_f64(field).is_some_and(|v| v >= min_value));
    debug!("removed {} feature(s) with {} < {}", removed, field, min_value);
    Ok(removed)
}
