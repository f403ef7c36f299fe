//! Pipeline orchestration.
//!
//! This module provides:
//! - [`PipelineOrchestrator`], the state machine driving the five stages
//! - [`ArtifactAggregator`], which turns task results into published artifacts
//! - [`PipelineSnapshot`], the read-only view handed to observers

mod aggregator;
mod orchestrator;
mod state;

pub use aggregator::{artifacts_from_result, ArtifactAggregator, DEFAULT_OBSERVATION, STDOUT_FILENAME_PREFIX};
pub use orchestrator::{OrchestratorOptions, PipelineOrchestrator, RunSummary};
pub use state::{PipelineSnapshot, TaskFailure};
