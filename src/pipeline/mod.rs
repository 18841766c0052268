//! Pipeline components: queues, stage protocol, result dispatch, tree building, failure report.

pub mod context;
pub mod dispatch;
pub mod error_handler;
pub mod orchestrator;
pub mod queue;
pub mod stage;
pub mod walk;

pub use context::{ItemQueue, PipelineContext, SharedContext};
pub use dispatch::{convert_batch, dispatch_results};
pub use error_handler::{Failure, FailureKind, RunReport, RunSummary, check_for_failures};
pub use orchestrator::PipelineBuilder;
pub use queue::Queue;
pub use stage::{close_children, run_stage};
pub use walk::{WalkOutcome, list_dir, to_outcome_walkdir};
