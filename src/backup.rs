//! Timestamped backups of files about to be overwritten.

use std::io;
use std::path::{Path, PathBuf};

use tracing::info;

const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Copy `path` to `{name}{ext}.{yyyyMMdd-HHmmss}.bak` beside it.
///
/// Returns `Ok(None)` when there is nothing to back up.
pub fn create_backup_if_exists(path: &Path) -> io::Result<Option<PathBuf>> {
    let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();
    create_backup_with_suffix(path, &timestamp)
}

/// Copy `path` to `{name}{ext}.{suffix}.bak`, appending `-NN` until the
/// name is unused
pub fn create_backup_with_suffix(path: &Path, suffix: &str) -> io::Result<Option<PathBuf>> {
    if !path.is_file() {
        return Ok(None);
    }

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    let directory = path.parent().unwrap_or_else(|| Path::new(""));

    let mut backup_path = directory.join(format!("{file_name}.{suffix}.bak"));
    let mut counter = 1;
    while backup_path.exists() {
        backup_path = directory.join(format!("{file_name}.{suffix}-{counter:02}.bak"));
        counter += 1;
    }

    std::fs::copy(path, &backup_path)?;
    info!(original = %path.display(), backup = %backup_path.display(), "Backup created");
    Ok(Some(backup_path))
}

/// Prepare `output_path` for writing: back it up unless `overwrite` is set.
///
/// Returns the backup path when one was created.
pub fn handle_output_file(output_path: &Path, overwrite: bool) -> io::Result<Option<PathBuf>> {
    if overwrite {
        return Ok(None);
    }
    create_backup_if_exists(output_path)
}
