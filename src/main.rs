//! Chainconv CLI: run one conversion pass over a directory tree (or a single file).

use anyhow::Result;
use chainconv::engine::arg_parser::Cli;
use chainconv::engine::handle_run;
use clap::Parser;
use std::time::Instant;

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
