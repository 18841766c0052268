//! Failure accounting for a run. Nothing inside the stage tree propagates errors upward:
//! each failure is logged where it happens and recorded here, per directory.

use anyhow::{Result, anyhow};
use log::{info, warn};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::Opts;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    /// A directory or entry could not be listed.
    Discovery,
    /// A directory's config could not be loaded.
    Config,
    /// Local files could not be listed, relocated or expanded; inbound items still flow.
    Scan,
    /// A conversion call failed; its inputs were not forwarded.
    Conversion,
    /// A converted result could not be written.
    Persist,
    /// Items reached a stage that could not process them.
    Dropped,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Discovery => "discovery",
            FailureKind::Config => "config",
            FailureKind::Scan => "scan",
            FailureKind::Conversion => "conversion",
            FailureKind::Persist => "persist",
            FailureKind::Dropped => "dropped",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug)]
pub struct Failure {
    pub kind: FailureKind,
    /// Directory of the stage that recorded the failure.
    pub directory: PathBuf,
    pub detail: String,
}

/// Shared across every stage and worker of one run.
#[derive(Debug, Default)]
pub struct RunReport {
    persisted: Mutex<Vec<PathBuf>>,
    failures: Mutex<Vec<Failure>>,
}

impl RunReport {
    pub fn record_persisted(&self, path: PathBuf) {
        self.persisted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path);
    }

    pub fn record_failure(&self, kind: FailureKind, directory: &Path, detail: impl Into<String>) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Failure {
                kind,
                directory: directory.to_path_buf(),
                detail: detail.into(),
            });
    }

    /// Snapshot of everything recorded so far.
    pub fn summary(&self) -> RunSummary {
        let mut persisted = self
            .persisted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        persisted.sort();
        RunSummary {
            persisted,
            failures: self
                .failures
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
        }
    }
}

/// Result of a finished run.
#[derive(Clone, Debug, Default)]
pub struct RunSummary {
    /// Every written output file, sorted.
    pub persisted: Vec<PathBuf>,
    pub failures: Vec<Failure>,
}

impl RunSummary {
    pub fn failures_of(&self, kind: FailureKind) -> impl Iterator<Item = &Failure> {
        self.failures.iter().filter(move |f| f.kind == kind)
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Log the run summary. In strict mode any recorded failure becomes the run's error.
/// Call after the root stage returned.
pub fn check_for_failures(opts: &Opts, summary: &RunSummary) -> Result<()> {
    info!(
        "Wrote {} file(s), {} failure(s)",
        summary.persisted.len(),
        summary.failures.len()
    );
    if summary.is_clean() {
        return Ok(());
    }
    for f in &summary.failures {
        warn!("  {} failure in {}: {}", f.kind, f.directory.display(), f.detail);
    }
    if opts.strict {
        return Err(anyhow!(
            "{} failure(s) during conversion run",
            summary.failures.len()
        ));
    }
    Ok(())
}
