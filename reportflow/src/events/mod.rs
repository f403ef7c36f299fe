//! Structured pipeline events for observers.
//!
//! The orchestrator owns one [`EventSink`]; the default discards everything.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

/// Event type names.
pub mod types {
    /// A run passed its preconditions and reset state.
    pub const PIPELINE_STARTED: &str = "pipeline.started";
    /// The current stage changed.
    pub const STAGE_CHANGED: &str = "pipeline.stage_changed";
    /// All tasks were attempted.
    pub const PIPELINE_COMPLETED: &str = "pipeline.completed";
    /// A fatal stage failure or cancellation aborted the run.
    pub const PIPELINE_FAILED: &str = "pipeline.failed";
    /// A task execution request is about to be sent.
    pub const TASK_STARTED: &str = "task.started";
    /// A task returned a result.
    pub const TASK_COMPLETED: &str = "task.completed";
    /// A task failed; the run continues.
    pub const TASK_FAILED: &str = "task.failed";
    /// The published artifact sequence changed.
    pub const ARTIFACTS_UPDATED: &str = "artifacts.updated";
}
