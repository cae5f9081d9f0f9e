//! Applying a downloaded update package onto a version directory.

use anyhow::Result;
use std::path::Path;
use tracing::info;

use crate::core::UpdaterError;

/// Extract the ZIP package at `package` onto `destination`.
///
/// Existing files are overwritten; files present in the destination but not
/// in the package are left alone. A corrupt archive or a filesystem error is
/// fatal; the partially patched destination is not reverted here. Retry or
/// abandon is the caller's decision.
pub fn apply_update(package: &Path, destination: &Path) -> Result<()> {
    let file = std::fs::File::open(package)
        .map_err(|e| UpdaterError::fs("open update package", package, e))?;

    let mut archive = zip::ZipArchive::new(file).map_err(|e| UpdaterError::Archive {
        package: package.to_path_buf(),
        reason: e.to_string(),
    })?;

    info!(
        "applying {} entries from {} onto {}",
        archive.len(),
        package.display(),
        destination.display()
    );

    archive.extract(destination).map_err(|e| UpdaterError::Archive {
        package: package.to_path_buf(),
        reason: e.to_string(),
    })?;

    Ok(())
}
