//! Imagery analysis algorithms
//!
//! Algorithms for multispectral grassland analysis:
//! - Spectral indices: NDVI, NDRE, NDWI
//! - Normalized difference: generic two-band index
//! - Masks: threshold and closed-range binary masks
//! - Reclassify: remap-table reclassification into integer classes

mod indices;
mod mask;
mod reclassify;

pub use indices::{ndre, ndvi, ndwi, normalized_difference, SpectralIndex};
pub use mask::{range_mask, threshold_mask, MASK_NODATA, MASK_VALUE};
pub use reclassify::{reclassify, RemapRange, RemapTable, CLASS_NODATA, NDRE_BREAKS};
