//! Shared context for every stage of one run: the injected conversion client, the scanner,
//! the conversion worker pool, queue sizing and the failure report.

use anyhow::{Context, Result};
use log::debug;
use std::path::Path;
use std::sync::Arc;

use crate::Opts;
use crate::engine::invoker::ConversionInvoker;
use crate::engine::scanner::Scanner;
use crate::types::Item;
use crate::utils::config::WorkerThreadLimits;
use crate::utils::tempfiles::default_work_root;

use super::error_handler::{FailureKind, RunReport};
use super::queue::Queue;

/// Shared handle passed to every stage thread.
pub type SharedContext = Arc<PipelineContext>;

/// Queue type linking a parent stage to a child stage.
pub type ItemQueue = Arc<Queue<Item>>;

pub struct PipelineContext {
    pub invoker: Arc<dyn ConversionInvoker>,
    pub scanner: Scanner,
    /// Runs conversion calls. Stage and forwarding threads never run on it, so its
    /// workers are never parked waiting for queue input.
    pub pool: rayon::ThreadPool,
    /// Capacity of parent→child queues; None = unbounded.
    pub queue_capacity: Option<usize>,
    pub report: RunReport,
    /// Root of the run, for log labels.
    pub root: std::path::PathBuf,
}

impl PipelineContext {
    pub fn new(
        root: &Path,
        invoker: Arc<dyn ConversionInvoker>,
        scanner: Scanner,
        opts: &Opts,
    ) -> Result<Self> {
        let num_threads = WorkerThreadLimits::current().conversion_threads(opts.num_threads);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("convert-{i}"))
            .build()
            .context("build conversion worker pool")?;
        debug!("conversion pool: {} thread(s)", num_threads);
        Ok(Self {
            invoker,
            scanner,
            pool,
            queue_capacity: opts.queue_capacity,
            report: RunReport::default(),
            root: root.to_path_buf(),
        })
    }

    /// Context with a scanner rooted at `opts.work_dir` (or the default work root).
    pub fn from_opts(root: &Path, invoker: Arc<dyn ConversionInvoker>, opts: &Opts) -> Result<Self> {
        let work_root = opts.work_dir.clone().unwrap_or_else(default_work_root);
        Self::new(root, invoker, Scanner::new(work_root), opts)
    }

    pub fn new_queue(&self) -> ItemQueue {
        Arc::new(Queue::with_capacity(self.queue_capacity))
    }

    /// Short label of `dir` for log lines.
    pub fn label(&self, dir: &Path) -> String {
        crate::engine::tools::display_rel(dir, &self.root)
    }

    pub fn fail(&self, kind: FailureKind, dir: &Path, detail: impl Into<String>) {
        self.report.record_failure(kind, dir, detail);
    }
}
