//! Error types for grassmap

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for grassmap operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("Band {band} requested but raster has {count} band(s)")]
    BandOutOfRange { band: usize, count: usize },

    #[error("Output already exists and overwrite is disabled: {}", .0.display())]
    OutputExists(PathBuf),

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Raster has no valid cells to compute statistics from")]
    EmptyStatistics,

    #[error("Cannot parse number from {text:?}")]
    ParseNumber { text: String },

    #[error("Invalid shapefile: {0}")]
    Shapefile(String),

    #[error("Shapefile error: {0}")]
    ShapefileFormat(#[from] shapefile::Error),

    #[error("dBase error: {0}")]
    Dbase(#[from] shapefile::dbase::Error),

    #[error("GDAL error: {0}")]
    #[cfg(feature = "gdal")]
    Gdal(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Algorithm error: {0}")]
    Algorithm(String),

    #[error("{0}")]
    Other(String),
}

#[cfg(feature = "gdal")]
impl From<gdal::errors::GdalError> for Error {
    fn from(e: gdal::errors::GdalError) -> Self {
        Error::Gdal(e.to_string())
    }
}

/// Result type alias for grassmap operations
pub type Result<T> = std::result::Result<T, Error>;
