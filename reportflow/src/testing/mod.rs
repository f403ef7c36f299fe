//! Testing utilities for reportflow.
//!
//! This module provides:
//! - A scripted transport that replays canned HTTP replies
//! - Canned stage results for orchestrator tests
//! - `MockStageApi` (test builds only) for scripting stage outcomes directly

mod fixtures;
mod mocks;

pub use fixtures::{
    execution_with_artifact, execution_with_stdout, plan_of, sample_input, sample_metadata,
    sample_profile, sample_upload, scripted_single_host,
};
pub use mocks::{RecordedCall, ScriptedReply, ScriptedTransport};

#[cfg(test)]
pub use crate::stages::MockStageApi;
