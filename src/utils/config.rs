//! Application configuration constants.
//! Tuning, reserved names and thresholds in one place.

use std::sync::OnceLock;
use std::time::Duration;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    pkg_name: &'static str,
    config_filename: String,
    work_dir_name: String,
    secret_env_key: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                pkg_name: pkg,
                config_filename: "config.toml".to_string(),
                work_dir_name: pkg.to_string(),
                secret_env_key: format!("{}_SECRET", pkg.to_uppercase()),
            }
        })
    }

    pub fn pkg_name(&self) -> &str {
        self.pkg_name
    }

    /// Per-directory stage configuration file. Never scanned as input.
    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }

    /// Directory under the system temp dir holding scanned working copies.
    pub fn work_dir_name(&self) -> &str {
        &self.work_dir_name
    }

    /// Environment variable holding the conversion service secret.
    pub fn secret_env_key(&self) -> &str {
        &self.secret_env_key
    }

    /// File names that are never picked up as conversion input (compared case-insensitively).
    pub fn reserved_file_names(&self) -> Vec<String> {
        vec![self.config_filename().to_string(), ".env".to_string()]
    }
}

// ---- Worker threads ----

/// Thread limits for the conversion worker pool.
/// Conversions are network-bound, so the pool is sized above the core count.
#[derive(Clone, Copy, Debug)]
pub struct WorkerThreadLimits {
    /// Available threads (from rayon); set by [`WorkerThreadLimits::current()`].
    pub all_threads: usize,
    /// Minimum pool size.
    pub floor: usize,
    /// Maximum pool size when derived from the core count.
    pub max: usize,
}

impl Default for WorkerThreadLimits {
    fn default() -> Self {
        Self {
            all_threads: 0, // use current() to set from rayon
            floor: Self::FLOOR_THREADS,
            max: Self::MAX_THREADS,
        }
    }
}

impl WorkerThreadLimits {
    pub const FLOOR_THREADS: usize = 4;
    pub const MAX_THREADS: usize = 32;
    /// In-flight conversion calls per available core.
    pub const CALLS_PER_CORE: usize = 2;

    /// Build limits with `all_threads` set from `rayon::current_num_threads()`.
    pub fn current() -> Self {
        Self {
            all_threads: rayon::current_num_threads(),
            ..Self::default()
        }
    }

    /// Pool size: `requested` when given (at least 1), else derived from the core count.
    pub fn conversion_threads(&self, requested: Option<usize>) -> usize {
        match requested {
            Some(n) => n.max(1),
            None => (self.all_threads * Self::CALLS_PER_CORE).clamp(self.floor, self.max),
        }
    }
}

// ---- Scanning ----

/// Relocation retry policy for files held open by another process.
pub struct ScanConsts;

impl ScanConsts {
    /// Attempts after the first failed move before the file is skipped.
    pub const MOVE_RETRY_LIMIT: usize = 100;
    /// Delay between move attempts.
    pub const MOVE_RETRY_DELAY: Duration = Duration::from_millis(500);
    /// Archive extension expanded into member files.
    pub const ARCHIVE_EXT: &'static str = "zip";
}

// ---- Conversion service ----

/// HTTP defaults for the ConvertAPI client.
pub struct HttpConsts;

impl HttpConsts {
    pub const DEFAULT_BASE_URL: &'static str = "https://v2.convertapi.com";
    /// Whole-request timeout; large batches upload and convert within one call.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
}
