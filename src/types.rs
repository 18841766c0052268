//! Public and internal types for the chainconv API and pipeline.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::utils::tempfiles::remove_file_and_empty_parents;

/// A file on local storage. Scanner-created files are working copies that get deleted
/// (together with their emptied working directory) once the last [`Item`] copy is dropped.
#[derive(Debug)]
pub struct LocalFile {
    path: PathBuf,
    /// Topmost working directory pruned once the file is removed; None = never removed.
    cleanup_root: Option<PathBuf>,
}

impl LocalFile {
    /// A working copy owned by the pipeline: removed from disk when no longer referenced.
    pub fn consumable(path: PathBuf) -> Self {
        let cleanup_root = path.parent().map(Path::to_path_buf);
        Self { path, cleanup_root }
    }

    /// A working copy nested somewhere below `root`: on removal, every directory up to and
    /// including `root` that was left empty goes too.
    pub fn consumable_within(path: PathBuf, root: PathBuf) -> Self {
        Self {
            path,
            cleanup_root: Some(root),
        }
    }

    /// A file the pipeline must leave in place.
    pub fn borrowed(path: PathBuf) -> Self {
        Self {
            path,
            cleanup_root: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LocalFile {
    fn drop(&mut self) {
        if let Some(root) = &self.cleanup_root {
            remove_file_and_empty_parents(&self.path, root);
        }
    }
}

/// A conversion result stored by the remote service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteFile {
    pub url: String,
    pub file_name: String,
    /// Extension reported by the service, when present.
    pub file_ext: Option<String>,
    pub size: Option<u64>,
}

/// A single file flowing between stages. Cloning is cheap and yields another logical copy
/// of the same underlying file; fan-out to several children hands each child a clone.
#[derive(Clone, Debug)]
pub enum Item {
    Local(Arc<LocalFile>),
    Remote(Arc<RemoteFile>),
}

impl Item {
    pub fn local(file: LocalFile) -> Self {
        Item::Local(Arc::new(file))
    }

    pub fn remote(file: RemoteFile) -> Self {
        Item::Remote(Arc::new(file))
    }

    /// Logical file name (no directory part).
    pub fn file_name(&self) -> &str {
        match self {
            Item::Local(f) => f
                .path()
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default(),
            Item::Remote(r) => &r.file_name,
        }
    }

    /// Source format: lower-case extension without the dot; empty when there is none.
    pub fn format(&self) -> String {
        match self {
            Item::Remote(r) => match r.file_ext.as_deref() {
                Some(ext) if !ext.is_empty() => ext.trim_start_matches('.').to_lowercase(),
                _ => format_of(&r.file_name),
            },
            Item::Local(_) => format_of(self.file_name()),
        }
    }
}

/// Lower-case extension of `file_name`, or empty.
pub fn format_of(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default()
}

/// Which local files of a directory a stage picks up as input.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocalFilePolicy {
    /// Consume local files only when the stage has children and does not write its own
    /// output into its directory (so outputs are never re-read as inputs).
    #[default]
    Auto,
    /// Always consume local files.
    Convert,
    /// Never consume local files.
    Ignore,
}

impl LocalFilePolicy {
    pub fn consumes_local(&self, has_children: bool, save_intermediate: bool) -> bool {
        match self {
            LocalFilePolicy::Auto => has_children && !save_intermediate,
            LocalFilePolicy::Convert => true,
            LocalFilePolicy::Ignore => false,
        }
    }
}

/// Configuration of one directory's stage. Loaded once at stage start, never mutated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StageConfig {
    /// Directory this configuration belongs to.
    pub directory: PathBuf,
    pub destination_format: String,
    /// Convert everything the stage receives in one call instead of one call per file.
    pub join_files: bool,
    /// Persist converted output even when it also flows to children.
    pub save_intermediate: bool,
    /// Extra conversion parameters, passed to the service in this order.
    pub params: Vec<(String, String)>,
    pub output_dir: PathBuf,
    pub local_files: LocalFilePolicy,
    /// Glob patterns (`*`, `?`) of local file names left untouched.
    pub exclude: Vec<String>,
}

impl StageConfig {
    /// Defaults for `directory`: destination format from the directory name, output into the directory itself.
    pub fn defaults_for(directory: &Path) -> Self {
        let destination_format = directory
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        Self {
            directory: directory.to_path_buf(),
            destination_format,
            join_files: false,
            save_intermediate: false,
            params: Vec::new(),
            output_dir: directory.to_path_buf(),
            local_files: LocalFilePolicy::default(),
            exclude: Vec::new(),
        }
    }
}

/// How a stage treats what it receives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StageMode {
    /// Entry stage: forward everything unchanged to every child. No format semantics.
    Root,
    /// Stage fed by a parent: convert what arrives.
    Chained,
}

/// Run options (CLI and lib).
#[derive(Clone, Debug, Default)]
pub struct Opts {
    /// Conversion worker threads. When None, derived from the core count.
    pub num_threads: Option<usize>,
    /// Capacity of each parent→child queue. When None, queues are unbounded.
    pub queue_capacity: Option<usize>,
    /// Where scanned files are moved before conversion. When None, `<temp>/chainconv`.
    pub work_dir: Option<PathBuf>,
    /// Debug logging.
    pub verbose: bool,
    /// Return an error from the run when any failure was recorded.
    pub strict: bool,
}
