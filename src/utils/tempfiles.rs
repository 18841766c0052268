use anyhow::{Context, Result};
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};

use crate::utils::config::PackagePaths;

/// Default root for scanned working copies: `<system temp>/<package name>`.
pub fn default_work_root() -> PathBuf {
    std::env::temp_dir().join(PackagePaths::get().work_dir_name())
}

/// Create a fresh, uniquely named directory under `work_root`.
pub fn create_unique_dir(work_root: &Path) -> Result<PathBuf> {
    let dir = work_root.join(uuid::Uuid::new_v4().to_string());
    fs::create_dir_all(&dir)
        .with_context(|| format!("create working directory {}", dir.display()))?;
    Ok(dir)
}

/// Remove a consumed working copy, then its directory when that left it empty.
/// Failures are logged, never raised: cleanup runs from `Drop`.
pub fn remove_file_and_empty_parent(path: &Path) {
    if let Some(parent) = path.parent() {
        remove_file_and_empty_parents(path, parent);
    } else {
        remove_working_copy(path);
    }
}

/// Remove a consumed working copy, then every directory between it and `top` (inclusive)
/// that the removal left empty.
pub fn remove_file_and_empty_parents(path: &Path, top: &Path) {
    if !remove_working_copy(path) {
        return;
    }
    let mut dir = path.parent();
    while let Some(d) = dir
        && d.starts_with(top)
    {
        let empty = fs::read_dir(d).is_ok_and(|mut entries| entries.next().is_none());
        if !empty || fs::remove_dir(d).is_err() || d == top {
            break;
        }
        dir = d.parent();
    }
}

/// False when the file is still there.
fn remove_working_copy(path: &Path) -> bool {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!("removed working copy {}", path.display());
            true
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
        Err(e) => {
            warn!("{}: {}", path.display(), e);
            false
        }
    }
}

/// Move `from` to `to`. Falls back to copy + remove when a rename cannot cross devices.
pub fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::CrossesDevices => {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
        Err(e) => Err(e),
    }
}
