//! Statistical summaries of raster data
//!
//! - **summary**: minimum, mean and maximum read from a raster's textual
//!   property report

pub mod summary;

pub use summary::{band_statistics, BandStatistics};
