//! Conversion service secret: `--secret` → env var → .env in the root dir → secure prompt.

use anyhow::{Context, Result, bail};
use colored::Colorize;
use log::{debug, info};
use std::path::Path;

use crate::utils::config::PackagePaths;

fn non_empty(s: String) -> Option<String> {
    let s = s.trim().to_string();
    (!s.is_empty()).then_some(s)
}

fn try_env_then_dotenv(dir: &Path) -> Option<String> {
    let key = PackagePaths::get().secret_env_key();
    if let Some(s) = std::env::var(key).ok().and_then(non_empty) {
        return Some(s);
    }
    let env_path = dir.join(".env");
    if env_path.is_file() {
        let _ = dotenvy::from_path(&env_path);
        if let Some(s) = std::env::var(key).ok().and_then(non_empty) {
            return Some(s);
        }
    }
    None
}

/// Resolve the secret. `explicit` (from the CLI) wins; `dir` is searched for a `.env` file.
pub fn get_secret(explicit: Option<&str>, dir: &Path) -> Result<String> {
    if let Some(s) = explicit.map(str::to_string).and_then(non_empty) {
        debug!("Secret taken from the command line");
        return Ok(s);
    }
    if let Some(s) = try_env_then_dotenv(dir) {
        info!("Secret found in environment");
        return Ok(s);
    }
    let label = format!("[{}]", env!("CARGO_PKG_NAME")).cyan().bold();
    let secret = rpassword::prompt_password(format!("{} Conversion service secret: ", label))
        .context("read secret")?;
    match non_empty(secret) {
        Some(s) => Ok(s),
        None => bail!(
            "no secret given; pass --secret or set {}",
            PackagePaths::get().secret_env_key()
        ),
    }
}
