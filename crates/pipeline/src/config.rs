//! Pipeline configuration
//!
//! Loaded from an optional JSON file; every field has a default so a partial
//! file (or none at all) is valid. The CLI applies its flags on top.

use crate::error::{PipelineError, Result};
use grassmap_core::NumericLocale;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming the project session document
pub const PROJECT_ENV: &str = "GRASSMAP_PROJECT";

/// Runtime settings for [`crate::run`]
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Replace existing outputs; when `false` any existing output is an error
    pub overwrite: bool,
    /// Decimal convention of the raster property report
    pub numeric_locale: NumericLocale,
    /// Project session document the result layer is added to
    pub project: Option<PathBuf>,
    /// Add the filtered polygons to the active map
    pub publish_to_map: bool,
    /// Directory holding the extension checkout lock
    pub license_dir: PathBuf,
    /// GeoTIFF compression (GDAL backend only)
    pub compression: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            overwrite: true,
            numeric_locale: NumericLocale::from_env(),
            project: std::env::var_os(PROJECT_ENV).map(PathBuf::from),
            publish_to_map: true,
            license_dir: std::env::temp_dir(),
            compression: "NONE".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Load a configuration file, filling missing fields with defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| PipelineError::Config(format!("failed to read {}: {e}", path.display())))?;
        serde_json::from_str(&contents)
            .map_err(|e| PipelineError::Config(format!("failed to parse {}: {e}", path.display())))
    }
}
