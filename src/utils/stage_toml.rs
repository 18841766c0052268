//! Load a directory's `config.toml` into a [`StageConfig`].
//!
//! Every key is optional; missing keys keep the defaults from [`StageConfig::defaults_for`]:
//!
//! ```toml
//! format = "pdf"
//! join = true
//! save_intermediate = false
//! output_dir = "out"
//! local_files = "auto"
//! exclude = ["*.part"]
//!
//! [params]
//! PageSize = "a4"
//! ```

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::types::{LocalFilePolicy, StageConfig};
use crate::utils::config::PackagePaths;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct StageToml {
    format: Option<String>,
    join: Option<bool>,
    save_intermediate: Option<bool>,
    output_dir: Option<PathBuf>,
    local_files: Option<LocalFilePolicy>,
    exclude: Option<Vec<String>>,
    #[serde(default)]
    params: toml::Table,
}

/// Overwrite config field from file when present.
macro_rules! apply_file_opt {
    ($file:expr, $cfg:expr, $file_field:ident => $cfg_field:ident) => {
        if let Some(v) = $file.$file_field {
            $cfg.$cfg_field = v;
        }
    };
}

fn param_value(value: toml::Value) -> String {
    match value {
        toml::Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Apply parsed file contents over the directory defaults.
fn apply_file_to_config(file: StageToml, cfg: &mut StageConfig) {
    if let Some(format) = file.format {
        cfg.destination_format = format.trim().trim_start_matches('.').to_lowercase();
    }
    apply_file_opt!(file, cfg, join => join_files);
    apply_file_opt!(file, cfg, save_intermediate => save_intermediate);
    apply_file_opt!(file, cfg, local_files => local_files);
    apply_file_opt!(file, cfg, exclude => exclude);
    if let Some(out) = file.output_dir {
        cfg.output_dir = if out.is_absolute() {
            out
        } else {
            cfg.directory.join(out)
        };
    }
    cfg.params = file
        .params
        .into_iter()
        .map(|(k, v)| (k, param_value(v)))
        .collect();
}

/// Parse `contents` as the config of `dir`.
pub fn parse_stage_config(dir: &Path, contents: &str) -> Result<StageConfig> {
    let file: StageToml = toml::from_str(contents).context("parse stage config")?;
    let mut cfg = StageConfig::defaults_for(dir);
    apply_file_to_config(file, &mut cfg);
    Ok(cfg)
}

/// Load the stage config of `dir`: its `config.toml` when present, else directory-name defaults.
pub fn load_stage_config(dir: &Path) -> Result<StageConfig> {
    let path = dir.join(PackagePaths::get().config_filename());
    let cfg = if path.is_file() {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("read {}", path.display()))?;
        parse_stage_config(dir, &s).with_context(|| format!("{}", path.display()))?
    } else {
        StageConfig::defaults_for(dir)
    };
    if cfg.destination_format.is_empty() {
        bail!("{}: no destination format configured", dir.display());
    }
    Ok(cfg)
}
