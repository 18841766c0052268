use clap::Parser;
use std::path::PathBuf;

struct DefaultArgs;

impl DefaultArgs {
    pub const PATH: &'static str = ".";
}

/// Directory-driven chained file conversion.
#[derive(Clone, Parser)]
#[command(name = "chainconv")]
#[command(
    about = "Convert files through a directory tree: each subdirectory converts what it receives and passes the results to its own subdirectories."
)]
pub struct Cli {
    /// Root directory to process, or a single file whose directory acts as the root. Default: current directory.
    #[arg(value_name = "PATH", default_value = DefaultArgs::PATH)]
    pub path: PathBuf,

    /// Conversion service secret. Default: CHAINCONV_SECRET, then .env in the root, then a prompt.
    #[arg(long, short = 's')]
    pub secret: Option<String>,

    /// Conversion worker threads (concurrent conversion calls). Default: derived from core count.
    #[arg(long, short = 'j', value_parser = clap::value_parser!(usize))]
    pub jobs: Option<usize>,

    /// Capacity of each parent→child queue. Default: unbounded.
    #[arg(long, value_parser = clap::value_parser!(usize))]
    pub queue_capacity: Option<usize>,

    /// Directory receiving scanned files before upload. Default: <temp>/chainconv.
    #[arg(long, value_name = "DIR")]
    pub work_dir: Option<PathBuf>,

    /// Conversion service base URL.
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Exit with an error when any conversion, scan or save failed.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub strict: Option<bool>,

    /// Verbose output.
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,
}

impl Cli {
    /// Directory searched for a `.env` file holding the secret.
    pub fn secret_dir(&self) -> PathBuf {
        if self.path.is_file() {
            self.path
                .parent()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DefaultArgs::PATH))
        } else {
            self.path.clone()
        }
    }
}
