//! Error types for the grassland pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while running the pipeline or talking to the project session
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Core(#[from] grassmap_core::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No active project session (set --project or GRASSMAP_PROJECT)")]
    NoActiveSession,

    #[error("Project {} has no active map", .0.display())]
    NoActiveMap(PathBuf),

    #[error("Extension {0:?} is not available for checkout")]
    ExtensionUnavailable(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
