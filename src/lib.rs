//! Chainconv: directory-driven chained file conversion.
//!
//! Every directory under a root is a conversion stage. Files dropped into the root are handed,
//! unchanged, to each subdirectory; each subdirectory converts what it receives to its own
//! format and hands the results on to its subdirectories, down to the leaves, which keep the
//! final output.

pub mod engine;
pub mod pipeline;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use types::*;

use log::debug;
use std::path::Path;
use std::sync::Arc;

use engine::ConversionInvoker;
use engine::tools::{canonical_dir, canonical_file};
use pipeline::{PipelineBuilder, PipelineContext, RunSummary};

/// Result alias used by public chainconv API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

fn builder_for(root: &Path, invoker: Arc<dyn ConversionInvoker>, opts: &Opts) -> Result<PipelineBuilder> {
    debug!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_uppercase(),
        opts
    );
    let ctx = PipelineContext::from_opts(root, invoker, opts)?;
    Ok(PipelineBuilder::new(Arc::new(ctx)))
}

/// Run one pass over `root`: files directly in `root` are forwarded to every subdirectory
/// stage, which convert and chain further. Returns once the whole tree has finished.
///
/// Failures inside the tree do not make this return `Err`; they are in the summary.
pub fn convert_dir(
    root: &Path,
    invoker: Arc<dyn ConversionInvoker>,
    opts: &Opts,
) -> Result<RunSummary> {
    let root = canonical_dir(root)?;
    let builder = builder_for(&root, invoker, opts)?;
    builder.run_root(&root);
    Ok(builder.context().report.summary())
}

/// Run one pass for a single file: its directory acts as the entry stage with that file as
/// its only input.
pub fn convert_file(
    file: &Path,
    invoker: Arc<dyn ConversionInvoker>,
    opts: &Opts,
) -> Result<RunSummary> {
    let (dir, file) = canonical_file(file)?;
    let builder = builder_for(&dir, invoker, opts)?;
    builder.run_file(&dir, file);
    Ok(builder.context().report.summary())
}
