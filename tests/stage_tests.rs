//! Stage protocol tests: forward-only fan-out, join vs per-file dispatch, persistence rules,
//! failure isolation and completion of child queues.

mod common;

use chainconv::engine::{ConversionInvoker, Scanner};
use chainconv::pipeline::{FailureKind, ItemQueue, PipelineContext, Queue, run_stage};
use chainconv::{Item, LocalFile, StageConfig, StageMode};
use common::{MockInvoker, file_names, test_opts, write_file};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

fn context(root: &Path, invoker: &Arc<MockInvoker>) -> PipelineContext {
    let opts = test_opts(&root.join(".work"));
    let invoker: Arc<dyn ConversionInvoker> = invoker.clone();
    PipelineContext::new(root, invoker, Scanner::new(root.join(".work")), &opts).unwrap()
}

fn items(dir: &Path, names: &[&str]) -> Vec<Item> {
    names
        .iter()
        .map(|n| {
            let path = write_file(dir, n, n);
            Item::local(LocalFile::borrowed(path))
        })
        .collect()
}

fn queues(n: usize) -> Vec<ItemQueue> {
    (0..n).map(|_| Arc::new(Queue::unbounded())).collect()
}

fn drained_names(q: &ItemQueue) -> Vec<String> {
    let mut names: Vec<String> = q.drain().map(|i| i.file_name().to_string()).collect();
    names.sort();
    names
}

fn config(dir: &Path, format: &str) -> StageConfig {
    let mut cfg = StageConfig::defaults_for(dir);
    cfg.destination_format = format.to_string();
    cfg
}

#[test]
fn test_nothing_to_do_closes_children() {
    let tmp = TempDir::new().unwrap();
    let invoker = Arc::new(MockInvoker::new());
    let ctx = context(tmp.path(), &invoker);
    let children = queues(3);
    run_stage(
        Vec::new(),
        &config(tmp.path(), "pdf"),
        &children,
        None,
        StageMode::Chained,
        &ctx,
    );
    for child in &children {
        assert!(child.is_complete());
        assert_eq!(child.drain().count(), 0);
    }
    assert!(invoker.calls().is_empty());
}

#[test]
fn test_root_mode_forwards_unchanged_to_every_child() {
    let tmp = TempDir::new().unwrap();
    let invoker = Arc::new(MockInvoker::new());
    let ctx = context(tmp.path(), &invoker);
    let children = queues(2);
    let local = items(&tmp.path().join("in"), &["a.txt", "b.txt"]);
    run_stage(
        local,
        &config(tmp.path(), "ignored"),
        &children,
        None,
        StageMode::Root,
        &ctx,
    );
    assert!(invoker.calls().is_empty(), "root stage must not convert");
    for child in &children {
        assert!(child.is_complete());
        assert_eq!(drained_names(child), vec!["a.txt", "b.txt"]);
    }
}

#[test]
fn test_join_issues_one_sorted_call() {
    let tmp = TempDir::new().unwrap();
    let invoker = Arc::new(MockInvoker::new());
    let ctx = context(tmp.path(), &invoker);
    let mut cfg = config(tmp.path(), "pdf");
    cfg.join_files = true;
    let local = items(&tmp.path().join("in"), &["c.png", "a.png", "b.png"]);
    let children = queues(1);
    run_stage(local, &cfg, &children, None, StageMode::Chained, &ctx);

    let calls = invoker.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].inputs, vec!["a.png", "b.png", "c.png"]);
    assert_eq!(calls[0].source_format, "png");
    assert_eq!(calls[0].destination_format, "pdf");
    assert_eq!(drained_names(&children[0]), vec!["a.pdf"]);
}

#[test]
fn test_without_join_each_file_is_its_own_call() {
    let tmp = TempDir::new().unwrap();
    let invoker = Arc::new(MockInvoker::new());
    let ctx = context(tmp.path(), &invoker);
    let local = items(&tmp.path().join("in"), &["c.png", "a.png", "b.png"]);
    let children = queues(1);
    run_stage(
        local,
        &config(tmp.path(), "pdf"),
        &children,
        None,
        StageMode::Chained,
        &ctx,
    );

    let calls = invoker.calls();
    assert_eq!(calls.len(), 3);
    for call in &calls {
        assert_eq!(call.inputs.len(), 1);
    }
    assert_eq!(
        drained_names(&children[0]),
        vec!["a.pdf", "b.pdf", "c.pdf"]
    );
}

#[test]
fn test_params_passed_through_in_order() {
    let tmp = TempDir::new().unwrap();
    let invoker = Arc::new(MockInvoker::new());
    let ctx = context(tmp.path(), &invoker);
    let mut cfg = config(tmp.path(), "pdf");
    cfg.params = vec![
        ("Zeta".to_string(), "1".to_string()),
        ("Alpha".to_string(), "2".to_string()),
    ];
    let local = items(&tmp.path().join("in"), &["a.docx"]);
    run_stage(local, &cfg, &queues(1), None, StageMode::Chained, &ctx);
    assert_eq!(invoker.calls()[0].params, cfg.params);
}

#[test]
fn test_intermediate_save_pushes_and_writes() {
    let tmp = TempDir::new().unwrap();
    let invoker = Arc::new(MockInvoker::new());
    let ctx = context(tmp.path(), &invoker);
    let out = tmp.path().join("out");
    let mut cfg = config(tmp.path(), "pdf");
    cfg.save_intermediate = true;
    cfg.output_dir = out.clone();
    let children = queues(1);
    run_stage(
        items(&tmp.path().join("in"), &["a.png"]),
        &cfg,
        &children,
        None,
        StageMode::Chained,
        &ctx,
    );
    assert_eq!(drained_names(&children[0]), vec!["a.pdf"]);
    assert_eq!(file_names(&out), vec!["a.pdf"]);
    assert_eq!(ctx.report.summary().persisted, vec![out.join("a.pdf")]);
}

#[test]
fn test_without_intermediate_save_only_pushes() {
    let tmp = TempDir::new().unwrap();
    let invoker = Arc::new(MockInvoker::new());
    let ctx = context(tmp.path(), &invoker);
    let out = tmp.path().join("out");
    let mut cfg = config(tmp.path(), "pdf");
    cfg.output_dir = out.clone();
    let children = queues(1);
    run_stage(
        items(&tmp.path().join("in"), &["a.png"]),
        &cfg,
        &children,
        None,
        StageMode::Chained,
        &ctx,
    );
    assert_eq!(drained_names(&children[0]), vec!["a.pdf"]);
    assert!(!out.exists());
    assert!(ctx.report.summary().persisted.is_empty());
}

#[test]
fn test_leaf_always_persists() {
    let tmp = TempDir::new().unwrap();
    let invoker = Arc::new(MockInvoker::new());
    let ctx = context(tmp.path(), &invoker);
    let out = tmp.path().join("out");
    let mut cfg = config(tmp.path(), "pdf");
    cfg.output_dir = out.clone();
    run_stage(
        items(&tmp.path().join("in"), &["a.png", "b.png"]),
        &cfg,
        &[],
        None,
        StageMode::Chained,
        &ctx,
    );
    assert_eq!(file_names(&out), vec!["a.pdf", "b.pdf"]);
    assert_eq!(
        std::fs::read_to_string(out.join("a.pdf")).unwrap(),
        "a.png>pdf"
    );
}

#[test]
fn test_conversion_failure_is_recorded_and_not_forwarded() {
    let tmp = TempDir::new().unwrap();
    let invoker = Arc::new(MockInvoker::new());
    let ctx = context(tmp.path(), &invoker);
    let children = queues(1);
    run_stage(
        items(&tmp.path().join("in"), &["a.png", "b.png"]),
        &config(tmp.path(), "invalid"),
        &children,
        None,
        StageMode::Chained,
        &ctx,
    );
    assert!(children[0].is_complete());
    assert_eq!(children[0].drain().count(), 0);
    let summary = ctx.report.summary();
    let failures: Vec<_> = summary.failures_of(FailureKind::Conversion).collect();
    assert_eq!(failures.len(), 2);
    assert!(failures.iter().any(|f| f.detail.contains("a.png -> invalid")));
}

#[test]
fn test_chained_stage_converts_late_inbound_items() {
    let tmp = TempDir::new().unwrap();
    let invoker = Arc::new(MockInvoker::new());
    let ctx = context(tmp.path(), &invoker);
    let inbound: ItemQueue = Arc::new(Queue::unbounded());
    let late = items(&tmp.path().join("in"), &["x.png", "y.png"]);
    let producer = {
        let inbound = Arc::clone(&inbound);
        thread::spawn(move || {
            for item in late {
                thread::sleep(Duration::from_millis(10));
                inbound.enqueue(item).unwrap();
            }
            inbound.mark_complete();
        })
    };
    let mut cfg = config(tmp.path(), "pdf");
    cfg.join_files = true;
    let children = queues(1);
    run_stage(
        Vec::new(),
        &cfg,
        &children,
        Some(Arc::clone(&inbound)),
        StageMode::Chained,
        &ctx,
    );
    producer.join().unwrap();
    let calls = invoker.calls();
    assert_eq!(calls.len(), 1, "join waits for inbound completion");
    assert_eq!(calls[0].inputs, vec!["x.png", "y.png"]);
    assert_eq!(drained_names(&children[0]), vec!["x.pdf"]);
}

#[test]
fn test_local_and_inbound_items_are_merged() {
    let tmp = TempDir::new().unwrap();
    let invoker = Arc::new(MockInvoker::new());
    let ctx = context(tmp.path(), &invoker);
    let inbound: ItemQueue = Arc::new(Queue::unbounded());
    for item in items(&tmp.path().join("in"), &["remote.png"]) {
        inbound.enqueue(item).unwrap();
    }
    inbound.mark_complete();
    let children = queues(1);
    run_stage(
        items(&tmp.path().join("local"), &["local.png"]),
        &config(tmp.path(), "pdf"),
        &children,
        Some(inbound),
        StageMode::Chained,
        &ctx,
    );
    assert_eq!(
        drained_names(&children[0]),
        vec!["local.pdf", "remote.pdf"]
    );
}

#[test]
fn test_fan_out_gives_every_child_a_copy() {
    let tmp = TempDir::new().unwrap();
    let invoker = Arc::new(MockInvoker::new());
    let ctx = context(tmp.path(), &invoker);
    let children = queues(3);
    run_stage(
        items(&tmp.path().join("in"), &["a.png"]),
        &config(tmp.path(), "pdf"),
        &children,
        None,
        StageMode::Chained,
        &ctx,
    );
    let received: Vec<Item> = children.iter().flat_map(|c| c.drain()).collect();
    assert_eq!(received.len(), 3);
    // All three copies share the converted file, which still exists while they are held.
    for item in &received {
        let Item::Local(file) = item else {
            panic!("mock results are local");
        };
        assert!(file.path().exists());
    }
}
