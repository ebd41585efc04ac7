//! # grassmap algorithms
//!
//! Raster and vector algorithms for grassland mapping.
//!
//! ## Available Algorithm Categories
//!
//! - **imagery**: Spectral indices, threshold and range masks, reclassification
//! - **statistics**: Band minimum, mean and maximum
//! - **vector**: Polygonize, area attribute, minimum-area filter

pub mod imagery;
mod maybe_rayon;
pub mod statistics;
pub mod vector;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::imagery::{
        ndre, ndvi, ndwi, normalized_difference, range_mask, reclassify, threshold_mask,
        RemapRange, RemapTable, SpectralIndex,
    };
    pub use crate::statistics::{band_statistics, BandStatistics};
    pub use crate::vector::{
        add_area_field, polygonize, polygonize_with, remove_smaller_than, Polygonize,
        PolygonizeParams,
    };
    pub use grassmap_core::prelude::*;
}
