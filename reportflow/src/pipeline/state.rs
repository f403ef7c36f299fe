//! Orchestrator state and the snapshots handed to observers.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::aggregator::ArtifactAggregator;
use crate::core::{Artifact, InputFile, MetadataResult, PipelineStage, Plan, ProfileResult, UploadResult};
use crate::errors::ErrorReport;
use crate::utils;

/// A task that failed without aborting its run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskFailure {
    /// Position of the task in the plan.
    pub task_index: usize,
    /// Task name.
    pub task_name: String,
    /// What went wrong.
    pub error: ErrorReport,
}

/// Point-in-time copy of everything the orchestrator tracks.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineSnapshot {
    /// Identifier of the current or last run.
    pub run_id: Option<Uuid>,
    /// Current stage.
    pub current_stage: PipelineStage,
    /// File the next run will use.
    pub selected_input: Option<InputFile>,
    /// Upload reply of the current run.
    pub upload: Option<UploadResult>,
    /// Profile reply of the current run.
    pub profile: Option<ProfileResult>,
    /// Metadata reply of the current run.
    pub metadata: Option<MetadataResult>,
    /// Plan of the current run.
    pub plan: Option<Plan>,
    /// Published artifacts, ordered by task index.
    pub artifacts: Vec<Artifact>,
    /// Tasks that failed in the current run.
    pub failed_tasks: Vec<TaskFailure>,
    /// Whether a run is in progress.
    pub is_running: bool,
    /// Forwarded to metadata, planning and execution.
    pub offline_mode: bool,
    /// When the current or last run started.
    pub started_at: Option<DateTime<Utc>>,
    /// When the last run ended.
    pub finished_at: Option<DateTime<Utc>>,
}

impl PipelineSnapshot {
    /// Number of planned tasks, zero before planning.
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.plan.as_ref().map_or(0, Plan::len)
    }

    /// Returns true if the last run ended in `Failed`.
    #[must_use]
    pub fn has_failed(&self) -> bool {
        self.current_stage.is_failed()
    }

    /// Wall-clock length of the last finished run.
    #[must_use]
    pub fn duration(&self) -> Option<chrono::Duration> {
        Some(self.finished_at? - self.started_at?)
    }
}

/// Mutable state behind the orchestrator's lock.
#[derive(Debug, Default)]
pub(crate) struct PipelineState {
    pub(crate) view: PipelineSnapshot,
    pub(crate) aggregator: ArtifactAggregator,
}

impl PipelineState {
    pub(crate) fn new(offline_mode: bool) -> Self {
        Self {
            view: PipelineSnapshot {
                offline_mode,
                ..PipelineSnapshot::default()
            },
            aggregator: ArtifactAggregator::new(),
        }
    }

    /// Clears every per-run field and marks a new run as started.
    pub(crate) fn begin(&mut self, run_id: Uuid) {
        self.clear_results();
        self.aggregator.clear();
        let view = &mut self.view;
        view.artifacts.clear();
        view.failed_tasks.clear();
        view.current_stage = PipelineStage::Idle;
        view.run_id = Some(run_id);
        view.is_running = true;
        view.started_at = Some(utils::now());
        view.finished_at = None;
    }

    /// Drops the intermediate stage results; artifacts stay.
    pub(crate) fn clear_results(&mut self) {
        let view = &mut self.view;
        view.upload = None;
        view.profile = None;
        view.metadata = None;
        view.plan = None;
    }

    pub(crate) fn finish(&mut self) {
        if self.view.is_running {
            self.view.is_running = false;
            self.view.finished_at = Some(utils::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{execution_with_artifact, plan_of, sample_input, sample_upload};

    #[test]
    fn test_begin_resets_run_fields() {
        let mut state = PipelineState::new(true);
        state.view.selected_input = Some(sample_input());
        state.view.upload = Some(sample_upload());
        state.view.plan = Some(plan_of(&["a"]));
        state.view.current_stage = PipelineStage::Failed {
            reason: "boom".to_string(),
        };
        state.view.artifacts = state.aggregator.append(0, &execution_with_artifact("a"));

        state.begin(Uuid::nil());

        assert!(state.view.is_running);
        assert_eq!(state.view.current_stage, PipelineStage::Idle);
        assert!(state.view.upload.is_none());
        assert!(state.view.plan.is_none());
        assert!(state.view.artifacts.is_empty());
        assert!(state.aggregator.is_empty());
        assert!(state.view.selected_input.is_some());
        assert!(state.view.offline_mode);
    }

    #[test]
    fn test_finish_records_end_once() {
        let mut state = PipelineState::default();
        state.begin(Uuid::nil());
        state.finish();
        let finished = state.view.finished_at;
        assert!(finished.is_some());
        assert!(state.view.duration().is_some());

        state.finish();
        assert_eq!(state.view.finished_at, finished);
    }

    #[test]
    fn test_snapshot_serializes_without_input_bytes() {
        let snapshot = PipelineSnapshot {
            selected_input: Some(sample_input()),
            ..PipelineSnapshot::default()
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["selected_input"]["name"], "recipes.csv");
        assert_eq!(json["current_stage"]["stage"], "idle");
        assert_eq!(snapshot.task_count(), 0);
    }
}
