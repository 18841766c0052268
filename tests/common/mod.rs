//! Shared test helpers: a recording conversion mock and directory-tree builders.

#![allow(dead_code)]

use anyhow::bail;
use chainconv::engine::{ConversionInvoker, ConversionRequest};
use chainconv::{Item, LocalFile, Opts};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

/// One recorded conversion call.
#[derive(Clone, Debug)]
pub struct Call {
    pub source_format: String,
    pub destination_format: String,
    pub inputs: Vec<String>,
    pub params: Vec<(String, String)>,
}

/// Converts by writing `<stem>.<dst>` files whose content is the inputs' content followed by
/// `>dst`, so a chain of conversions leaves its trail in the final file.
/// Destination format `invalid` fails.
pub struct MockInvoker {
    out: TempDir,
    counter: AtomicUsize,
    calls: Mutex<Vec<Call>>,
}

impl MockInvoker {
    pub fn new() -> Self {
        Self {
            out: TempDir::new().unwrap(),
            counter: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, destination_format: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.destination_format == destination_format)
            .collect()
    }
}

fn stem(name: &str) -> &str {
    Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name)
}

impl ConversionInvoker for MockInvoker {
    fn convert(&self, request: &ConversionRequest<'_>) -> anyhow::Result<Vec<Item>> {
        let inputs: Vec<String> = request
            .items
            .iter()
            .map(|i| i.file_name().to_string())
            .collect();
        self.calls.lock().unwrap().push(Call {
            source_format: request.source_format.to_string(),
            destination_format: request.destination_format.to_string(),
            inputs: inputs.clone(),
            params: request.params.to_vec(),
        });
        if request.destination_format == "invalid" {
            bail!("unsupported destination format: invalid");
        }
        let content: String = request
            .items
            .iter()
            .map(|item| match item {
                Item::Local(f) => fs::read_to_string(f.path()).unwrap_or_default(),
                Item::Remote(r) => r.file_name.clone(),
            })
            .collect::<Vec<_>>()
            .join("+");
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let dir = self.out.path().join(n.to_string());
        fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{}.{}", stem(&inputs[0]), request.destination_format));
        fs::write(&path, format!("{}>{}", content, request.destination_format))?;
        Ok(vec![Item::local(LocalFile::consumable(path))])
    }
}

/// Write `content` to `dir/name`, creating `dir`.
pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

pub fn mkdir(dir: &Path) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    dir.to_path_buf()
}

/// File names directly inside `dir`, sorted.
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

/// Options with a private work dir under `work`.
pub fn test_opts(work: &Path) -> Opts {
    Opts {
        num_threads: Some(4),
        work_dir: Some(work.to_path_buf()),
        ..Default::default()
    }
}
