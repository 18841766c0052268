//! Builds the stage tree: one stage thread per directory, linked parent → child by queues.
//!
//! The tree is a snapshot: subdirectories created after their parent stage started are not
//! picked up.

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::types::{Item, StageConfig, StageMode};
use crate::utils::stage_toml::load_stage_config;

use super::context::{ItemQueue, SharedContext};
use super::error_handler::FailureKind;
use super::stage::{close_children, run_stage};
use super::walk;

/// Running child stages of one directory.
struct Children {
    queues: Vec<ItemQueue>,
    handles: Vec<(PathBuf, JoinHandle<()>)>,
}

/// What a stage scans locally.
enum LocalSource {
    /// Every file directly inside the directory.
    Directory,
    /// Exactly these files (single-file entry).
    Files(Vec<PathBuf>),
}

#[derive(Clone)]
pub struct PipelineBuilder {
    ctx: SharedContext,
}

impl PipelineBuilder {
    pub fn new(ctx: SharedContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &SharedContext {
        &self.ctx
    }

    /// Run `root` as the entry stage (forward-only) and wait for the whole tree.
    pub fn run_root(&self, root: &Path) {
        self.run_with(root, None, LocalSource::Directory);
    }

    /// Run `file`'s directory as the entry stage with `file` as its only local input.
    pub fn run_file(&self, dir: &Path, file: PathBuf) {
        self.run_with(dir, None, LocalSource::Files(vec![file]));
    }

    /// Run the stage of `directory`. Without `inbound` it is an entry stage (forward-only);
    /// with one it converts what arrives. Returns after the stage and all its descendants finished.
    pub fn run(&self, directory: &Path, inbound: Option<ItemQueue>) {
        self.run_with(directory, inbound, LocalSource::Directory);
    }

    fn run_with(&self, directory: &Path, inbound: Option<ItemQueue>, source: LocalSource) {
        let mode = match inbound {
            Some(_) => StageMode::Chained,
            None => StageMode::Root,
        };
        let label = self.ctx.label(directory);
        debug!("{}: stage start ({:?})", label, mode);

        let children = self.spawn_children(directory);

        match load_stage_config(directory) {
            Ok(config) => {
                let local = self.scan_local(&config, children.queues.len(), source);
                run_stage(local, &config, &children.queues, inbound, mode, &self.ctx);
            }
            Err(e) => {
                error!("{}: {:#}", label, e);
                self.ctx
                    .fail(FailureKind::Config, directory, format!("{:#}", e));
                self.abandon(directory, inbound, &children.queues);
            }
        }

        self.join_children(children);
        debug!("{}: stage finished", label);
    }

    /// Step 1: one queue and one running stage per immediate subdirectory.
    fn spawn_children(&self, directory: &Path) -> Children {
        let mut children = Children {
            queues: Vec::new(),
            handles: Vec::new(),
        };
        let subdirs = match walk::subdirectories(directory) {
            Ok((subdirs, skipped)) => {
                for (path, msg) in skipped {
                    self.ctx.fail(FailureKind::Discovery, &path, msg);
                }
                subdirs
            }
            Err(e) => {
                error!("{}: {:#}", self.ctx.label(directory), e);
                self.ctx
                    .fail(FailureKind::Discovery, directory, format!("{:#}", e));
                return children;
            }
        };
        for subdir in subdirs {
            let queue = self.ctx.new_queue();
            let builder = self.clone();
            let child_queue = Arc::clone(&queue);
            let child_dir = subdir.clone();
            let spawned = thread::Builder::new()
                .name(format!("stage:{}", self.ctx.label(&subdir)))
                .spawn(move || builder.run(&child_dir, Some(child_queue)));
            match spawned {
                Ok(handle) => {
                    children.queues.push(queue);
                    children.handles.push((subdir, handle));
                }
                Err(e) => {
                    error!("{}: could not start stage: {}", self.ctx.label(&subdir), e);
                    self.ctx.fail(
                        FailureKind::Discovery,
                        &subdir,
                        format!("could not start stage: {e}"),
                    );
                }
            }
        }
        children
    }

    /// Step 3: pick up local files when the policy consumes them. A failed listing or scan
    /// is recorded and leaves the stage with no local items; inbound items still flow.
    fn scan_local(&self, config: &StageConfig, child_count: usize, source: LocalSource) -> Vec<Item> {
        let directory = &config.directory;
        let label = self.ctx.label(directory);
        if !config
            .local_files
            .consumes_local(child_count > 0, config.save_intermediate)
        {
            debug!("{}: local files left in place ({:?})", label, config.local_files);
            return Vec::new();
        }
        match self.scan_entries(config, source) {
            Ok(items) => {
                if !items.is_empty() {
                    info!("{}: picked up {} file(s)", label, items.len());
                }
                items
            }
            Err(e) => {
                error!("{}: local files skipped: {:#}", label, e);
                self.ctx.fail(FailureKind::Scan, directory, format!("{:#}", e));
                Vec::new()
            }
        }
    }

    fn scan_entries(&self, config: &StageConfig, source: LocalSource) -> Result<Vec<Item>> {
        let directory = &config.directory;
        let entries = match source {
            LocalSource::Files(files) => files,
            LocalSource::Directory => {
                let (files, skipped) = walk::files(directory)
                    .with_context(|| format!("list files of {}", directory.display()))?;
                for (path, msg) in skipped {
                    self.ctx.fail(FailureKind::Scan, &path, msg);
                }
                files
            }
        };
        let scanned = self.ctx.scanner.scan(entries, &config.exclude)?;
        for (path, reason) in scanned.skipped {
            self.ctx
                .fail(FailureKind::Scan, directory, format!("{}: {}", path.display(), reason));
        }
        Ok(scanned.items)
    }

    /// A stage that cannot run still closes its children and drains its inbound queue,
    /// so neither side of it blocks. Drained items are reported as dropped.
    fn abandon(&self, directory: &Path, inbound: Option<ItemQueue>, children: &[ItemQueue]) {
        close_children(children);
        let Some(inbound) = inbound else {
            return;
        };
        let dropped: Vec<String> = inbound
            .drain()
            .map(|item| item.file_name().to_string())
            .collect();
        if !dropped.is_empty() {
            let detail = format!("dropped {} incoming file(s): {}", dropped.len(), dropped.join(", "));
            warn!("{}: {}", self.ctx.label(directory), detail);
            self.ctx.fail(FailureKind::Dropped, directory, detail);
        }
    }

    /// Wait for every child stage. A panicked stage is recorded; its siblings are unaffected.
    fn join_children(&self, children: Children) {
        for (dir, handle) in children.handles {
            if handle.join().is_err() {
                error!("{}: stage panicked", self.ctx.label(&dir));
                self.ctx.fail(FailureKind::Dropped, &dir, "stage panicked");
            }
        }
    }
}
