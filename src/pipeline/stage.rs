//! The convert-and-forward protocol of one stage.
//!
//! ```text
//! START → MERGING → FORWARD_ONLY (root) | CONVERTING (chained) → CLOSING → DONE
//! ```
//!
//! MERGING fills a working buffer with the local items and, through a dedicated forwarding
//! thread, with everything arriving on the inbound queue. CLOSING marks every child queue
//! complete; it always runs, so descendants never wait on a finished stage.

use log::{debug, warn};
use std::sync::Arc;
use std::thread;

use crate::types::{Item, StageConfig, StageMode};

use super::context::{ItemQueue, PipelineContext};
use super::dispatch::convert_batch;
use super::queue::Queue;

/// Run the protocol for one stage. Every child queue is complete when this returns.
pub fn run_stage(
    local: Vec<Item>,
    config: &StageConfig,
    children: &[ItemQueue],
    inbound: Option<ItemQueue>,
    mode: StageMode,
    ctx: &PipelineContext,
) {
    let label = ctx.label(&config.directory);
    let _closing = CloseOnDrop(children);
    if local.is_empty() && inbound.is_none() {
        debug!("{}: nothing to do", label);
        return;
    }

    let buffer = merge(local, inbound, config, ctx);

    match mode {
        StageMode::Root => forward_only(&buffer, children),
        StageMode::Chained if config.join_files => {
            let items: Vec<Item> = buffer.drain().collect();
            debug!("{}: joining {} item(s)", label, items.len());
            convert_batch(items, config, children, ctx);
        }
        StageMode::Chained => {
            // The scope runs on this stage thread and waits for every spawned call.
            ctx.pool.in_place_scope(|scope| {
                for item in buffer.drain() {
                    scope.spawn(move |_| convert_batch(vec![item], config, children, ctx));
                }
            });
        }
    }

    debug!("{}: done", label);
}

/// Build the working buffer: local items now, inbound items as they arrive.
fn merge(
    local: Vec<Item>,
    inbound: Option<ItemQueue>,
    config: &StageConfig,
    ctx: &PipelineContext,
) -> Arc<Queue<Item>> {
    let buffer: Arc<Queue<Item>> = Arc::new(Queue::unbounded());
    for item in local {
        if let Err(rejected) = buffer.enqueue(item) {
            warn!(
                "{}: working buffer closed, dropped {}",
                ctx.label(&config.directory),
                rejected.into_inner().file_name()
            );
        }
    }
    let Some(inbound) = inbound else {
        buffer.mark_complete();
        return buffer;
    };
    let forward_buffer = Arc::clone(&buffer);
    let forward_inbound = Arc::clone(&inbound);
    let spawned = thread::Builder::new()
        .name(format!("forward:{}", ctx.label(&config.directory)))
        .spawn(move || forward(&forward_inbound, &forward_buffer));
    if let Err(e) = spawned {
        // Fall back to draining inline: nothing is lost, conversion just starts later.
        warn!(
            "{}: could not start forwarding thread ({}); draining inbound inline",
            ctx.label(&config.directory),
            e
        );
        forward(&inbound, &buffer);
    }
    buffer
}

/// Move everything from `inbound` into `buffer`, then complete the buffer.
fn forward(inbound: &Queue<Item>, buffer: &Queue<Item>) {
    for item in inbound.drain() {
        if let Err(rejected) = buffer.enqueue(item) {
            warn!(
                "working buffer closed, dropped {}",
                rejected.into_inner().file_name()
            );
        }
    }
    buffer.mark_complete();
}

/// Root mode: hand every item unchanged to every child.
fn forward_only(buffer: &Queue<Item>, children: &[ItemQueue]) {
    for item in buffer.drain() {
        for child in children {
            if let Err(rejected) = child.enqueue(item.clone()) {
                warn!(
                    "child queue already closed, dropped {}",
                    rejected.into_inner().file_name()
                );
            }
        }
    }
}

pub fn close_children(children: &[ItemQueue]) {
    for child in children {
        child.mark_complete();
    }
}

/// Marks every child queue complete when dropped, including while unwinding from a panic.
struct CloseOnDrop<'a>(&'a [ItemQueue]);

impl Drop for CloseOnDrop<'_> {
    fn drop(&mut self) {
        close_children(self.0);
    }
}
