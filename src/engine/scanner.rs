//! Turns a directory's local files into ready [`Item`]s.
//!
//! Files are moved out of the watched tree into a private working directory (so a later
//! pass never sees them again), zip archives are expanded into their member files, and
//! every item is a consumable working copy removed once the pipeline drops it.

use anyhow::{Context, Result};
use log::{debug, error, warn};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use walkdir::WalkDir;

use crate::pipeline::walk::{WalkOutcome, to_outcome_walkdir};
use crate::types::{Item, LocalFile};
use crate::utils::config::{PackagePaths, ScanConsts};
use crate::utils::tempfiles::{create_unique_dir, move_file, remove_file_and_empty_parent};

use super::tools::should_scan;

/// Retry policy for moving files another process still holds.
#[derive(Clone, Copy, Debug)]
pub struct MoveRetry {
    pub limit: usize,
    pub delay: Duration,
}

impl Default for MoveRetry {
    fn default() -> Self {
        Self {
            limit: ScanConsts::MOVE_RETRY_LIMIT,
            delay: ScanConsts::MOVE_RETRY_DELAY,
        }
    }
}

/// Outcome of one scan: the ready items and the entries that were skipped, with the reason.
#[derive(Debug, Default)]
pub struct ScanResult {
    pub items: Vec<Item>,
    pub skipped: Vec<(PathBuf, String)>,
}

#[derive(Clone, Debug)]
pub struct Scanner {
    work_root: PathBuf,
    reserved: Vec<String>,
    retry: MoveRetry,
}

impl Scanner {
    pub fn new(work_root: PathBuf) -> Self {
        Self {
            work_root,
            reserved: PackagePaths::get().reserved_file_names(),
            retry: MoveRetry::default(),
        }
    }

    pub fn with_retry(mut self, retry: MoveRetry) -> Self {
        self.retry = retry;
        self
    }

    pub fn work_root(&self) -> &Path {
        &self.work_root
    }

    /// Entries of `entries` that would be scanned: reserved, OS-hidden and `exclude`d names are dropped.
    pub fn filter_entries(&self, entries: Vec<PathBuf>, exclude: &[String]) -> Vec<PathBuf> {
        entries
            .into_iter()
            .filter(|p| should_scan(p, &self.reserved, exclude))
            .collect()
    }

    /// Relocate, expand and wrap `entries`. Per-entry failures are logged and reported in
    /// [`ScanResult::skipped`]; they never abort the other entries.
    pub fn scan(&self, entries: Vec<PathBuf>, exclude: &[String]) -> Result<ScanResult> {
        let entries = self.filter_entries(entries, exclude);
        let mut result = ScanResult::default();
        if entries.is_empty() {
            return Ok(result);
        }
        let work_dir = create_unique_dir(&self.work_root)?;
        for entry in entries {
            let moved = match self.move_with_retry(&entry, &work_dir) {
                Ok(p) => p,
                Err(e) => {
                    error!("Unable to access: {}: {:#}", entry.display(), e);
                    result.skipped.push((entry, format!("{e:#}")));
                    continue;
                }
            };
            if is_archive(&moved) {
                match self.expand_archive(&moved) {
                    Ok(members) => result.items.extend(members),
                    Err(e) => {
                        error!("Unable to expand archive {}: {:#}", entry.display(), e);
                        remove_file_and_empty_parent(&moved);
                        result.skipped.push((entry, format!("{e:#}")));
                    }
                }
            } else {
                result.items.push(Item::local(LocalFile::consumable(moved)));
            }
        }
        // Nothing moved in (every entry skipped): drop the empty working directory.
        let _ = fs::remove_dir(&work_dir);
        debug!(
            "scanned {} item(s), skipped {}",
            result.items.len(),
            result.skipped.len()
        );
        Ok(result)
    }

    /// Move `file` into `work_dir`, retrying while another process holds it.
    fn move_with_retry(&self, file: &Path, work_dir: &Path) -> Result<PathBuf> {
        let name = file
            .file_name()
            .with_context(|| format!("{} has no file name", file.display()))?;
        let dest = work_dir.join(name);
        let mut attempt = 0;
        loop {
            match move_file(file, &dest) {
                Ok(()) => return Ok(dest),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    return Err(e).context("file vanished before it could be moved");
                }
                Err(e) if attempt >= self.retry.limit => {
                    return Err(e).context(format!("gave up after {} retries", attempt));
                }
                Err(e) => {
                    if attempt == 0 {
                        warn!("{} is busy ({}); retrying", file.display(), e);
                    }
                    attempt += 1;
                    thread::sleep(self.retry.delay);
                }
            }
        }
    }

    /// Extract `archive` into a fresh working directory and return its member files.
    /// The archive itself is removed afterwards.
    fn expand_archive(&self, archive: &Path) -> Result<Vec<Item>> {
        let file = File::open(archive).with_context(|| format!("open {}", archive.display()))?;
        let mut zip = zip::ZipArchive::new(file).context("read zip archive")?;
        let dest = create_unique_dir(&self.work_root)?;
        if let Err(e) = zip.extract(&dest) {
            let _ = fs::remove_dir_all(&dest);
            return Err(e).context("extract zip archive");
        }
        drop(zip);
        remove_file_and_empty_parent(archive);

        let mut members = Vec::new();
        for outcome in WalkDir::new(&dest)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .map(to_outcome_walkdir)
        {
            match outcome {
                WalkOutcome::Ok(path) if path.is_file() => {
                    members.push(Item::local(LocalFile::consumable_within(path, dest.clone())));
                }
                WalkOutcome::Ok(_) => {}
                WalkOutcome::Err { msg, path } => warn!(
                    "{}: {}",
                    path.unwrap_or_else(|| dest.clone()).display(),
                    msg
                ),
            }
        }
        debug!(
            "expanded {} into {} file(s)",
            archive.display(),
            members.len()
        );
        Ok(members)
    }
}

fn is_archive(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ScanConsts::ARCHIVE_EXT))
}
