//! Binary masks from index rasters
//!
//! Masks are `u8` rasters: cells that pass hold 1, every other cell holds
//! [`MASK_NODATA`], which is also the raster's declared no-data value.
//!
//! Index rasters are persisted as float32, so cell values and bounds are
//! compared at single precision. An NDVI of `(0.8 - 0.2) / (0.8 + 0.2)` is
//! then exactly 0.6 and does not pass a `> 0.6` threshold.

use crate::maybe_rayon::map_cells;
use grassmap_core::raster::Raster;
use grassmap_core::{Error, Result};

/// Value of cells that do not pass a mask
pub const MASK_NODATA: u8 = 0;

/// Value of cells that pass a mask
pub const MASK_VALUE: u8 = 1;

#[inline]
fn stored(value: f64) -> f32 {
    value as f32
}

/// Mask of cells strictly greater than `threshold`.
///
/// No-data cells never pass.
///
/// # Example
/// ```ignore
/// let water = threshold_mask(&ndwi, 0.0)?;
/// let forest = threshold_mask(&ndvi, 0.6)?;
/// ```
pub fn threshold_mask(raster: &Raster<f64>, threshold: f64) -> Result<Raster<u8>> {
    map_cells(raster, Some(MASK_NODATA), |v| match v {
        Some(v) if stored(v) > stored(threshold) => MASK_VALUE,
        _ => MASK_NODATA,
    })
}

/// Mask of cells within the closed interval `[low, high]`.
///
/// Both bounds are inclusive. No-data cells never pass.
pub fn range_mask(raster: &Raster<f64>, low: f64, high: f64) -> Result<Raster<u8>> {
    if !(low <= high) {
        return Err(Error::InvalidParameter {
            name: "range",
            value: format!("[{}, {}]", low, high),
            reason: "lower bound must not exceed upper bound".into(),
        });
    }

    let bounds = stored(low)..=stored(high);
    map_cells(raster, Some(MASK_NODATA), |v| match v {
        Some(v) if bounds.contains(&stored(v)) => MASK_VALUE,
        _ => MASK_NODATA,
    })
}
