//! I/O operations for reading and writing geospatial data

#[cfg(feature = "gdal")]
mod gdal_io;
mod native;
mod shapefile_io;

use crate::error::{Error, Result};
use std::path::Path;

#[cfg(feature = "gdal")]
pub use gdal_io::{read_bands, read_geotiff, read_shapefile, write_bands, write_geotiff, write_shapefile};

#[cfg(not(feature = "gdal"))]
pub use native::{read_bands, read_geotiff, write_bands, write_geotiff};
#[cfg(not(feature = "gdal"))]
pub use shapefile_io::{read_shapefile, write_shapefile};

/// File extensions making up one shapefile
pub(crate) const SHAPEFILE_COMPONENTS: [&str; 4] = ["shp", "shx", "dbf", "prj"];

/// Options for writing GeoTIFF files
#[derive(Debug, Clone)]
pub struct GeoTiffOptions {
    /// Compression type: "DEFLATE", "LZW", "NONE" (GDAL backend only)
    pub compression: String,
    /// Replace an existing file; when `false` an existing target is an error
    pub overwrite: bool,
}

impl Default for GeoTiffOptions {
    fn default() -> Self {
        Self {
            compression: "NONE".to_string(),
            overwrite: true,
        }
    }
}

/// Options for writing shapefiles
#[derive(Debug, Clone)]
pub struct ShapefileOptions {
    /// Replace existing files; when `false` any existing component is an error
    pub overwrite: bool,
}

impl Default for ShapefileOptions {
    fn default() -> Self {
        Self { overwrite: true }
    }
}

/// Fail with `OutputExists` when `path` exists and overwriting is disabled
pub(crate) fn ensure_writable(path: &Path, overwrite: bool) -> Result<()> {
    if !overwrite && path.exists() {
        return Err(Error::OutputExists(path.to_path_buf()));
    }
    Ok(())
}
