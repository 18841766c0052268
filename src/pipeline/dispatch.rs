//! One conversion call and the routing of its results to children and/or disk.

use log::{debug, error, info, warn};

use crate::engine::invoker::ConversionRequest;
use crate::types::{Item, StageConfig};

use super::context::{ItemQueue, PipelineContext};
use super::error_handler::FailureKind;

/// Convert `items` in a single call and dispatch the results.
///
/// Items are sorted by file name; the batch's source format is the first item's. A failed
/// call is logged with the input names and target format, recorded, and goes no further.
/// The inputs are released once the call returns.
pub fn convert_batch(
    mut items: Vec<Item>,
    config: &StageConfig,
    children: &[ItemQueue],
    ctx: &PipelineContext,
) {
    if items.is_empty() {
        return;
    }
    items.sort_by(|a, b| a.file_name().cmp(b.file_name()));
    let source_format = items[0].format();
    let request = ConversionRequest {
        source_format: &source_format,
        destination_format: &config.destination_format,
        items: &items,
        params: &config.params,
    };
    let names = request.file_names();
    info!(
        "{}: converting {} -> {}",
        ctx.label(&config.directory),
        names,
        config.destination_format
    );
    let results = match ctx.invoker.convert(&request) {
        Ok(results) => results,
        Err(e) => {
            let detail = format!(
                "Unable to convert: {} -> {}: {:#}",
                names, config.destination_format, e
            );
            error!("{}", detail);
            ctx.fail(FailureKind::Conversion, &config.directory, detail);
            return;
        }
    };
    drop(items);
    debug!(
        "{}: {} -> {} result(s)",
        ctx.label(&config.directory),
        names,
        results.len()
    );
    dispatch_results(results, config, children, ctx);
}

/// Push every result to every child; persist it when there are no children or the stage
/// saves intermediate output.
pub fn dispatch_results(
    results: Vec<Item>,
    config: &StageConfig,
    children: &[ItemQueue],
    ctx: &PipelineContext,
) {
    for result in results {
        for child in children {
            if let Err(rejected) = child.enqueue(result.clone()) {
                let detail = format!(
                    "child queue already closed, dropped {}",
                    rejected.into_inner().file_name()
                );
                warn!("{}: {}", ctx.label(&config.directory), detail);
                ctx.fail(FailureKind::Dropped, &config.directory, detail);
            }
        }
        if children.is_empty() || config.save_intermediate {
            persist(&result, config, ctx);
        }
    }
}

fn persist(result: &Item, config: &StageConfig, ctx: &PipelineContext) {
    match ctx.invoker.persist(result, &config.output_dir) {
        Ok(path) => {
            println!("{}", path.display());
            ctx.report.record_persisted(path);
        }
        Err(e) => {
            let detail = format!(
                "Unable to save {} into {}: {:#}",
                result.file_name(),
                config.output_dir.display(),
                e
            );
            error!("{}", detail);
            ctx.fail(FailureKind::Persist, &config.directory, detail);
        }
    }
}
