//! Band summary statistics
//!
//! Values are read back from the raster's textual property report, which is
//! formatted in the active numeric locale, and normalized to dot-decimal
//! before parsing.

use grassmap_core::raster::{parse_decimal, NumericLocale, Raster, RasterProperty};
use grassmap_core::Result;
use std::fmt;

/// Minimum, mean and maximum of the valid cells of a band
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandStatistics {
    pub min: f64,
    pub mean: f64,
    pub max: f64,
}

impl fmt::Display for BandStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Min: {:.3}, Mean: {:.3}, Max: {:.3}", self.min, self.mean, self.max)
    }
}

fn read_property(raster: &Raster<f64>, property: RasterProperty, locale: NumericLocale) -> Result<f64> {
    let text = raster.property_text(property, locale)?;
    parse_decimal(&text)
}

/// Compute band statistics over valid cells.
///
/// Fails with `Error::EmptyStatistics` when the raster has no valid cell.
///
/// # Arguments
/// * `raster` - Index raster (NaN no-data)
/// * `locale` - Decimal convention of the property report
pub fn band_statistics(raster: &Raster<f64>, locale: NumericLocale) -> Result<BandStatistics> {
    Ok(BandStatistics {
        min: read_property(raster, RasterProperty::Minimum, locale)?,
        mean: read_property(raster, RasterProperty::Mean, locale)?,
        max: read_property(raster, RasterProperty::Maximum, locale)?,
    })
}
