//! CLI command handler: one conversion pass over a directory tree or a single file.

use anyhow::{Context, Result};
use log::{debug, warn};
use std::sync::Arc;

use crate::Opts;
use crate::engine::arg_parser::Cli;
use crate::engine::convertapi::ConvertApiClient;
use crate::engine::invoker::ConversionInvoker;
use crate::pipeline::check_for_failures;
use crate::utils::config::HttpConsts;
use crate::utils::{get_secret, setup_logging};
use crate::{convert_dir, convert_file};

fn setup_opts(cli: &Cli) -> Opts {
    let verbose = cli.verbose.unwrap_or(false);
    setup_logging(verbose);
    Opts {
        num_threads: cli.jobs,
        queue_capacity: cli.queue_capacity,
        work_dir: cli.work_dir.clone(),
        verbose,
        strict: cli.strict.unwrap_or(false),
    }
}

/// In-flight conversions are abandoned on Ctrl+C; nothing is drained.
fn install_interrupt_handler() -> Result<()> {
    ctrlc::set_handler(|| {
        warn!("Interrupted; abandoning in-flight conversions");
        std::process::exit(130);
    })
    .context("set Ctrl+C handler")
}

/// Run one pass over `cli.path` with the ConvertAPI client.
pub fn handle_run(cli: &Cli) -> Result<()> {
    let opts = setup_opts(cli);
    install_interrupt_handler()?;

    let secret = get_secret(cli.secret.as_deref(), &cli.secret_dir())?;
    let base_url = cli
        .base_url
        .as_deref()
        .unwrap_or(HttpConsts::DEFAULT_BASE_URL);
    let invoker: Arc<dyn ConversionInvoker> =
        Arc::new(ConvertApiClient::with_base_url(&secret, base_url)?);

    let summary = if cli.path.is_file() {
        debug!("Converting single file {}", cli.path.display());
        convert_file(&cli.path, invoker, &opts)?
    } else {
        debug!("Converting directory tree {}", cli.path.display());
        convert_dir(&cli.path, invoker, &opts)?
    };
    check_for_failures(&opts, &summary)
}
