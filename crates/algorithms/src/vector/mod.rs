//! Vector algorithms
//!
//! - Polygonize: connected raster regions to polygon features
//! - Area: planar measurement, area attribute and minimum-area filter

mod area_filter;
mod measurements;
mod polygonize;

pub use area_filter::{add_area_field, remove_smaller_than, AREA_FIELD, MIN_AREA_M2};
pub use measurements::area;
pub use polygonize::{polygonize, polygonize_with, Polygonize, PolygonizeParams, ID_FIELD, VALUE_FIELD};
