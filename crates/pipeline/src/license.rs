//! Scoped checkout of a licensed extension
//!
//! A checkout is an exclusive advisory lock on a file named after the
//! extension. It is held for the lifetime of [`ExtensionCheckout`] and
//! released when the guard is dropped. The operating system also releases
//! it when the holding process dies, so a killed run leaves the file behind
//! but not the checkout.

use crate::error::{PipelineError, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Extension required by the raster algebra steps
pub const SPATIAL_ANALYST: &str = "Spatial";

/// Held extension license, released on drop
#[derive(Debug)]
pub struct ExtensionCheckout {
    extension: String,
    lock_path: PathBuf,
    file: File,
}

impl ExtensionCheckout {
    /// Check out `extension`, failing with `ExtensionUnavailable` while
    /// another checkout of the same extension is held in `license_dir`.
    pub fn acquire(extension: &str, license_dir: &Path) -> Result<Self> {
        let lock_path = license_dir.join(format!("grassmap-{}.lock", extension.to_lowercase()));

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;
        match file.try_lock_exclusive() {
            Ok(()) => {}
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                return Err(PipelineError::ExtensionUnavailable(extension.to_string()));
            }
            Err(e) => return Err(e.into()),
        }
        // Holder pid, for humans inspecting the lock directory
        file.set_len(0)?;
        writeln!(file, "{}", std::process::id())?;

        debug!("checked out extension {} ({})", extension, lock_path.display());
        Ok(Self {
            extension: extension.to_string(),
            lock_path,
            file,
        })
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }
}

impl Drop for ExtensionCheckout {
    fn drop(&mut self) {
        match FileExt::unlock(&self.file) {
            Ok(()) => debug!("checked in extension {}", self.extension),
            Err(e) => warn!("failed to check in extension {}: {}", self.extension, e),
        }
    }
}
