//! One-level directory listing: the subdirectories that become child stages and the files a stage may scan.

use anyhow::{Result, anyhow};
use log::warn;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One result from a directory walk: either a path to consider or an error with optional path.
pub enum WalkOutcome {
    Ok(PathBuf),
    Err { msg: String, path: Option<PathBuf> },
}

/// Convert a walkdir result into [`WalkOutcome`].
pub fn to_outcome_walkdir(r: Result<walkdir::DirEntry, walkdir::Error>) -> WalkOutcome {
    match r {
        Ok(entry) => WalkOutcome::Ok(entry.into_path()),
        Err(err) => WalkOutcome::Err {
            msg: format!("{}", err),
            path: err.path().map(PathBuf::from),
        },
    }
}

/// (subdirectories, files, skipped entries with their error).
pub type DirListing = (Vec<PathBuf>, Vec<PathBuf>, Vec<(PathBuf, String)>);

/// Immediate children of `dir`, sorted by name, split into subdirectories and files.
/// Unreadable entries are logged and returned in the skipped slot. Symlinked directories
/// are not followed, so the stage tree stays acyclic. Fails only when `dir` itself cannot be read.
pub fn list_dir(dir: &Path) -> Result<DirListing> {
    let mut subdirs = Vec::new();
    let mut files = Vec::new();
    let mut skipped = Vec::new();
    let iter = WalkDir::new(dir)
        .min_depth(0)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .map(to_outcome_walkdir);
    for outcome in iter {
        match outcome {
            WalkOutcome::Ok(path) if path == dir => {}
            WalkOutcome::Ok(path) if path.is_dir() && !path.is_symlink() => subdirs.push(path),
            WalkOutcome::Ok(path) if path.is_file() => files.push(path),
            WalkOutcome::Ok(_) => {}
            WalkOutcome::Err { msg, path } => match path {
                Some(p) if p != dir => {
                    warn!("{}: {}", p.display(), msg);
                    skipped.push((p, msg));
                }
                _ => return Err(anyhow!("list {}: {}", dir.display(), msg)),
            },
        }
    }
    Ok((subdirs, files, skipped))
}

/// Immediate subdirectories of `dir` (sorted). See [`list_dir`].
pub fn subdirectories(dir: &Path) -> Result<(Vec<PathBuf>, Vec<(PathBuf, String)>)> {
    let (subdirs, _, skipped) = list_dir(dir)?;
    Ok((subdirs, skipped))
}

/// Files directly inside `dir` (sorted). See [`list_dir`].
pub fn files(dir: &Path) -> Result<(Vec<PathBuf>, Vec<(PathBuf, String)>)> {
    let (_, files, skipped) = list_dir(dir)?;
    Ok((files, skipped))
}
