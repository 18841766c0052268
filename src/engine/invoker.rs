//! The seam between the pipeline and whatever performs conversions.

use anyhow::{Context, Result, bail};
use std::fs;
use std::path::{Path, PathBuf};

use crate::types::Item;

/// One conversion call: a batch of items sharing `source_format`, converted to `destination_format`.
#[derive(Clone, Copy, Debug)]
pub struct ConversionRequest<'a> {
    pub source_format: &'a str,
    pub destination_format: &'a str,
    /// Inputs, already ordered by the caller.
    pub items: &'a [Item],
    /// Extra parameters, passed through unmodified and in order.
    pub params: &'a [(String, String)],
}

impl ConversionRequest<'_> {
    /// Comma-separated input file names, for log lines.
    pub fn file_names(&self) -> String {
        self.items
            .iter()
            .map(Item::file_name)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Performs conversions and stores their results. Shared by every stage of a run.
pub trait ConversionInvoker: Send + Sync {
    /// Convert the request's items, returning the result items.
    fn convert(&self, request: &ConversionRequest<'_>) -> Result<Vec<Item>>;

    /// Write `item` into `dir` under its file name and return the full path.
    /// The default handles local items; remote-backed invokers override it.
    fn persist(&self, item: &Item, dir: &Path) -> Result<PathBuf> {
        copy_local(item, dir)
    }
}

/// Copy a local item into `dir` under its file name. Remote items are an error.
pub fn copy_local(item: &Item, dir: &Path) -> Result<PathBuf> {
    match item {
        Item::Local(file) => {
            fs::create_dir_all(dir)
                .with_context(|| format!("create output directory {}", dir.display()))?;
            let dest = dir.join(item.file_name());
            fs::copy(file.path(), &dest)
                .with_context(|| format!("copy {} -> {}", file.path().display(), dest.display()))?;
            Ok(dest)
        }
        Item::Remote(remote) => bail!(
            "cannot persist remote result {} ({}) without a download client",
            remote.file_name,
            remote.url
        ),
    }
}
