//! The pipeline state machine.
//!
//! A run uploads the selected file, profiles it, extracts metadata, plans
//! tasks and executes them. Failures of the first four stages abort the run;
//! task failures are recorded and the remaining tasks still run.

use futures::stream::{self, StreamExt};
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::json;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::state::{PipelineSnapshot, PipelineState, TaskFailure};
use crate::cancellation::CancellationToken;
use crate::config::{FatalPolicy, ServiceConfig};
use crate::core::{Artifact, ExecutionResult, InputFile, PipelineStage, Plan, ProfileResult, Task};
use crate::errors::{ReportflowError, Result};
use crate::events::{types, EventSink, NoOpEventSink};
use crate::report;
use crate::stages::{HttpStageApi, StageApi};
use crate::utils;

/// Execution knobs of the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorOptions {
    /// Tasks executed at once; 1 runs them strictly in plan order.
    pub task_concurrency: usize,
    /// Stage handling after a fatal failure.
    pub fatal_policy: FatalPolicy,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            task_concurrency: 1,
            fatal_policy: FatalPolicy::MarkFailed,
        }
    }
}

impl OrchestratorOptions {
    /// Options taken from a service configuration.
    #[must_use]
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            task_concurrency: config.task_concurrency,
            fatal_policy: config.fatal_policy,
        }
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    /// Run identifier.
    pub run_id: Uuid,
    /// Number of planned tasks.
    pub task_count: usize,
    /// Number of published artifacts.
    pub artifact_count: usize,
    /// Tasks that failed.
    pub failed_tasks: Vec<TaskFailure>,
}

impl RunSummary {
    /// Returns true if every task succeeded.
    #[must_use]
    pub fn all_tasks_succeeded(&self) -> bool {
        self.failed_tasks.is_empty()
    }
}

/// Clears `is_running` however the run ends, including when the run future is dropped.
struct RunningGuard<'a> {
    state: &'a RwLock<PipelineState>,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.state.write().finish();
    }
}

/// Drives the remote stages and owns the pipeline state.
pub struct PipelineOrchestrator {
    api: Arc<dyn StageApi>,
    options: OrchestratorOptions,
    state: RwLock<PipelineState>,
    events: Arc<dyn EventSink>,
}

impl std::fmt::Debug for PipelineOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineOrchestrator")
            .field("options", &self.options)
            .field("current_stage", &self.state.read().view.current_stage)
            .finish_non_exhaustive()
    }
}

impl PipelineOrchestrator {
    /// Creates an orchestrator with default options.
    #[must_use]
    pub fn new(api: Arc<dyn StageApi>) -> Self {
        Self {
            api,
            options: OrchestratorOptions::default(),
            state: RwLock::new(PipelineState::new(false)),
            events: Arc::new(NoOpEventSink),
        }
    }

    /// Builds the HTTP stages and options from `config`.
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        let api = HttpStageApi::from_config(config.clone())?;
        Ok(Self::new(Arc::new(api))
            .with_options(OrchestratorOptions::from_config(config))
            .with_initial_offline_mode(config.offline_mode))
    }

    /// Replaces the options.
    #[must_use]
    pub fn with_options(mut self, options: OrchestratorOptions) -> Self {
        self.options = options;
        self
    }

    /// Routes events to `sink`.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = sink;
        self
    }

    #[must_use]
    fn with_initial_offline_mode(self, offline_mode: bool) -> Self {
        self.state.write().view.offline_mode = offline_mode;
        self
    }

    /// The active options.
    #[must_use]
    pub fn options(&self) -> OrchestratorOptions {
        self.options
    }

    /// Selects the file for the next run. Rejected while a run is active.
    pub fn select_input(&self, input: InputFile) -> Result<()> {
        let mut state = self.state.write();
        if state.view.is_running {
            return Err(ReportflowError::precondition("cannot change input while a run is active"));
        }
        info!(file = input.name(), bytes = input.len(), "Input selected");
        state.view.selected_input = Some(input);
        Ok(())
    }

    /// Toggles offline mode for the next run. Rejected while a run is active.
    pub fn set_offline_mode(&self, offline_mode: bool) -> Result<()> {
        let mut state = self.state.write();
        if state.view.is_running {
            return Err(ReportflowError::precondition(
                "cannot change offline mode while a run is active",
            ));
        }
        state.view.offline_mode = offline_mode;
        Ok(())
    }

    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> PipelineSnapshot {
        self.state.read().view.clone()
    }

    /// Whether a run is in progress.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state.read().view.is_running
    }

    /// The current stage.
    #[must_use]
    pub fn current_stage(&self) -> PipelineStage {
        self.state.read().view.current_stage.clone()
    }

    /// The published artifacts.
    #[must_use]
    pub fn artifacts(&self) -> Vec<Artifact> {
        self.state.read().view.artifacts.clone()
    }

    /// The published artifacts as a Markdown report.
    #[must_use]
    pub fn export_markdown(&self, title: &str) -> String {
        report::render_markdown(title, &self.artifacts())
    }

    /// Writes the Markdown report to `path`.
    pub async fn export_to(&self, path: impl AsRef<Path>, title: &str) -> Result<()> {
        let artifacts = self.artifacts();
        report::write_report(path, title, &artifacts).await
    }

    /// Runs the whole pipeline on the selected input.
    ///
    /// Fails with [`ReportflowError::Precondition`] before touching any state
    /// when no input is selected or a run is already active. A failure of the
    /// upload, profile, metadata or plan stage, or cancellation, aborts the
    /// run and is returned. Task failures are recorded in the snapshot and do
    /// not fail the run.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<RunSummary> {
        let (run_id, input, offline_mode) = self.begin_run()?;
        let running = RunningGuard { state: &self.state };

        let span = info_span!("pipeline_run", run_id = %run_id, file = %input.name(), offline_mode);
        async move {
            info!("Pipeline started");
            self.events
                .emit(
                    types::PIPELINE_STARTED,
                    Some(json!({"run_id": run_id, "file": input.name(), "offline_mode": offline_mode})),
                )
                .await;

            match self.drive(&input, offline_mode, cancel).await {
                Ok(task_count) => {
                    self.advance(PipelineStage::Completed, |_| {});
                    drop(running);
                    let summary = self.summary(run_id, task_count);
                    info!(
                        tasks = summary.task_count,
                        artifacts = summary.artifact_count,
                        failed = summary.failed_tasks.len(),
                        "Pipeline completed"
                    );
                    self.events
                        .emit(types::PIPELINE_COMPLETED, serde_json::to_value(&summary).ok())
                        .await;
                    Ok(summary)
                }
                Err(err) => {
                    self.abort(&err);
                    drop(running);
                    self.events
                        .emit(types::PIPELINE_FAILED, Some(json!({"run_id": run_id, "error": err.to_report()})))
                        .await;
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }

    fn begin_run(&self) -> Result<(Uuid, InputFile, bool)> {
        let mut state = self.state.write();
        if state.view.is_running {
            return Err(ReportflowError::precondition("a run is already in progress"));
        }
        let Some(input) = state.view.selected_input.clone() else {
            return Err(ReportflowError::precondition("no input file selected"));
        };
        let run_id = utils::generate_run_id();
        state.begin(run_id);
        Ok((run_id, input, state.view.offline_mode))
    }

    async fn drive(&self, input: &InputFile, offline_mode: bool, cancel: &CancellationToken) -> Result<usize> {
        let upload = guarded(cancel, || self.api.upload(input, cancel)).await?;
        info!(remote_file_path = %upload.remote_file_path, "Upload complete");
        self.advance(PipelineStage::Uploaded, |view| view.upload = Some(upload.clone()));

        let profile = guarded(cancel, || self.api.profile(&upload, cancel)).await?;
        self.advance(PipelineStage::Profiled, |view| view.profile = Some(profile.clone()));

        let metadata = guarded(cancel, || self.api.extract_metadata(&profile, offline_mode, cancel)).await?;
        info!(columns = metadata.column_descriptions.len(), "Metadata extracted");
        self.advance(PipelineStage::MetadataExtracted, |view| view.metadata = Some(metadata.clone()));

        let plan = guarded(cancel, || self.api.plan(&profile, &metadata, offline_mode, cancel)).await?;
        info!(tasks = plan.len(), "Plan received");
        self.advance(PipelineStage::Planned, |view| view.plan = Some(plan.clone()));

        self.advance(PipelineStage::Executing, |_| {});
        self.execute_tasks(&plan, input, &profile, offline_mode, cancel).await?;
        Ok(plan.len())
    }

    async fn execute_tasks(
        &self,
        plan: &Plan,
        input: &InputFile,
        profile: &ProfileResult,
        offline_mode: bool,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let concurrency = self.options.task_concurrency.max(1);
        let mut outcomes = stream::iter(plan.tasks.iter().enumerate())
            .map(|(index, task)| async move {
                self.events
                    .emit(
                        types::TASK_STARTED,
                        Some(json!({"task_index": index, "task_name": task.display_name()})),
                    )
                    .await;
                let outcome = guarded(cancel, || {
                    self.api.execute_task(task, input, profile, offline_mode, cancel)
                })
                .await;
                (index, task, outcome)
            })
            .buffer_unordered(concurrency);

        while let Some((index, task, outcome)) = outcomes.next().await {
            match outcome {
                Ok(result) => self.publish(index, task, &result).await,
                Err(err) if err.is_cancelled() => return Err(err),
                Err(err) => self.record_task_failure(index, task, &err).await,
            }
        }
        Ok(())
    }

    async fn publish(&self, index: usize, task: &Task, result: &ExecutionResult) {
        let (added, total) = {
            let mut state = self.state.write();
            let before = state.aggregator.len();
            let artifacts = state.aggregator.append(index, result);
            let total = artifacts.len();
            state.view.artifacts = artifacts;
            (total - before, total)
        };
        info!(task_index = index, task = task.display_name(), added, total, "Task completed");

        self.events
            .emit(
                types::TASK_COMPLETED,
                Some(json!({"task_index": index, "task_name": task.display_name(), "artifacts": added})),
            )
            .await;
        if added > 0 {
            self.events
                .emit(types::ARTIFACTS_UPDATED, Some(json!({"count": total})))
                .await;
        }
    }

    async fn record_task_failure(&self, index: usize, task: &Task, err: &ReportflowError) {
        warn!(task_index = index, task = task.display_name(), error = %err, "Task failed");
        let failure = TaskFailure {
            task_index: index,
            task_name: task.display_name().to_string(),
            error: err.to_report(),
        };
        let payload = serde_json::to_value(&failure).ok();
        self.state.write().view.failed_tasks.push(failure);
        self.events.emit(types::TASK_FAILED, payload).await;
    }

    fn advance(&self, stage: PipelineStage, apply: impl FnOnce(&mut PipelineSnapshot)) {
        {
            let mut state = self.state.write();
            apply(&mut state.view);
            state.view.current_stage = stage.clone();
        }
        info!(stage = %stage, "Stage changed");
        self.events
            .try_emit(types::STAGE_CHANGED, serde_json::to_value(&stage).ok());
    }

    fn abort(&self, err: &ReportflowError) {
        let stage = match self.options.fatal_policy {
            FatalPolicy::MarkFailed => PipelineStage::Failed {
                reason: err.to_string(),
            },
            FatalPolicy::ResetToIdle => PipelineStage::Idle,
        };
        let failed_at = {
            let mut state = self.state.write();
            let failed_at = state.view.current_stage.clone();
            state.clear_results();
            state.view.current_stage = stage.clone();
            failed_at
        };
        if err.is_cancelled() {
            warn!(after = %failed_at, reason = %err, "Pipeline cancelled");
        } else {
            error!(after = %failed_at, error = %err, "Pipeline failed");
        }
        self.events
            .try_emit(types::STAGE_CHANGED, serde_json::to_value(&stage).ok());
    }

    fn summary(&self, run_id: Uuid, task_count: usize) -> RunSummary {
        let state = self.state.read();
        RunSummary {
            run_id,
            task_count,
            artifact_count: state.view.artifacts.len(),
            failed_tasks: state.view.failed_tasks.clone(),
        }
    }
}

/// Starts `call` only if `cancel` has not fired, then awaits it unless `cancel` fires first.
async fn guarded<T, F>(cancel: &CancellationToken, call: impl FnOnce() -> F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    if cancel.is_cancelled() {
        return Err(cancel.to_error());
    }
    let call = call();
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(cancel.to_error()),
        result = call => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::CollectingEventSink;
    use crate::testing::{
        execution_with_artifact, execution_with_stdout, plan_of, sample_input, sample_metadata, sample_profile,
        sample_upload, MockStageApi,
    };
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn server_error(path: &str) -> ReportflowError {
        ReportflowError::HttpStatus {
            status: 500,
            url: format!("http://svc/api{path}"),
            body: String::new(),
        }
    }

    /// A mock whose first four stages succeed and whose plan holds `tasks`.
    fn happy_stages(tasks: &'static [&'static str]) -> MockStageApi {
        let mut api = MockStageApi::new();
        api.expect_upload().returning(|_, _| Ok(sample_upload()));
        api.expect_profile().returning(|_, _| Ok(sample_profile()));
        api.expect_extract_metadata().returning(|_, _, _| Ok(sample_metadata()));
        api.expect_plan().returning(move |_, _, _, _| Ok(plan_of(tasks)));
        api
    }

    fn orchestrator(api: MockStageApi) -> PipelineOrchestrator {
        let orchestrator = PipelineOrchestrator::new(Arc::new(api));
        orchestrator.select_input(sample_input()).unwrap();
        orchestrator
    }

    #[test]
    fn test_new_orchestrator_starts_idle_and_online() {
        let orchestrator = PipelineOrchestrator::new(Arc::new(MockStageApi::new()));
        let snapshot = orchestrator.snapshot();

        assert_eq!(snapshot.current_stage, PipelineStage::Idle);
        assert!(!snapshot.offline_mode);
        assert!(!snapshot.is_running);
        assert!(snapshot.run_id.is_none());
        assert!(snapshot.artifacts.is_empty());
    }

    #[tokio::test]
    async fn test_run_without_input_is_precondition_failure() {
        let mut api = MockStageApi::new();
        api.expect_upload().times(0);
        let orchestrator = PipelineOrchestrator::new(Arc::new(api));

        let err = orchestrator.run(&CancellationToken::new()).await.unwrap_err();

        assert_eq!(err.kind(), "precondition");
        let snapshot = orchestrator.snapshot();
        assert_eq!(snapshot.current_stage, PipelineStage::Idle);
        assert!(snapshot.run_id.is_none());
        assert!(!snapshot.is_running);
    }

    #[tokio::test]
    async fn test_full_run_reaches_completed() {
        let mut api = happy_stages(&["a", "b"]);
        api.expect_execute_task()
            .times(2)
            .returning(|task, _, _, _, _| Ok(execution_with_artifact(&task.name)));
        let sink = Arc::new(CollectingEventSink::new());
        let orchestrator = orchestrator(api).with_event_sink(sink.clone());

        let summary = orchestrator.run(&CancellationToken::new()).await.unwrap();

        assert_eq!(summary.task_count, 2);
        assert_eq!(summary.artifact_count, 2);
        assert!(summary.all_tasks_succeeded());
        let snapshot = orchestrator.snapshot();
        assert_eq!(snapshot.current_stage, PipelineStage::Completed);
        assert!(!snapshot.is_running);
        assert_eq!(snapshot.upload, Some(sample_upload()));
        assert_eq!(snapshot.task_count(), 2);
        assert!(snapshot.finished_at.is_some());

        let stages: Vec<_> = sink
            .events_of_type(types::STAGE_CHANGED)
            .into_iter()
            .filter_map(|(_, data)| data)
            .map(|data| data["stage"].as_str().unwrap_or_default().to_string())
            .collect();
        assert_eq!(
            stages,
            vec!["uploaded", "profiled", "metadata_extracted", "planned", "executing", "completed"]
        );
        assert_eq!(sink.event_types().first().map(String::as_str), Some(types::PIPELINE_STARTED));
        assert_eq!(sink.event_types().last().map(String::as_str), Some(types::PIPELINE_COMPLETED));
    }

    #[tokio::test]
    async fn test_failed_task_is_isolated() {
        let mut api = happy_stages(&["A", "B", "C"]);
        api.expect_execute_task().times(3).returning(|task, _, _, _, _| {
            if task.name == "B" {
                Err(server_error("/execute_task"))
            } else {
                Ok(execution_with_artifact(&task.name))
            }
        });
        let orchestrator = orchestrator(api);

        let summary = orchestrator.run(&CancellationToken::new()).await.unwrap();

        let names: Vec<String> = orchestrator.artifacts().into_iter().map(|a| a.filename).collect();
        assert_eq!(names, vec!["A.png", "C.png"]);
        assert_eq!(summary.failed_tasks.len(), 1);
        assert_eq!(summary.failed_tasks[0].task_index, 1);
        assert_eq!(summary.failed_tasks[0].task_name, "B");
        assert_eq!(summary.failed_tasks[0].error.kind, "http_status");
        assert_eq!(orchestrator.current_stage(), PipelineStage::Completed);
    }

    #[tokio::test]
    async fn test_second_run_replaces_artifacts() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut api = MockStageApi::new();
        let counter = runs.clone();
        api.expect_upload().returning(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(sample_upload())
        });
        api.expect_profile().returning(|_, _| Ok(sample_profile()));
        api.expect_extract_metadata().returning(|_, _, _| Ok(sample_metadata()));
        api.expect_plan().returning(|_, _, _, _| Ok(plan_of(&["only"])));
        let counter = runs.clone();
        api.expect_execute_task().returning(move |_, _, _, _, _| {
            let run = counter.load(Ordering::SeqCst);
            Ok(execution_with_artifact(&format!("run{run}")))
        });
        let orchestrator = orchestrator(api);
        let cancel = CancellationToken::new();

        let first = orchestrator.run(&cancel).await.unwrap();
        let second = orchestrator.run(&cancel).await.unwrap();

        assert_ne!(first.run_id, second.run_id);
        let names: Vec<String> = orchestrator.artifacts().into_iter().map(|a| a.filename).collect();
        assert_eq!(names, vec!["run2.png"]);
    }

    #[tokio::test]
    async fn test_profile_failure_marks_failed() {
        let mut api = MockStageApi::new();
        api.expect_upload().returning(|_, _| Ok(sample_upload()));
        api.expect_profile().returning(|_, _| Err(server_error("/profile")));
        api.expect_extract_metadata().times(0);
        api.expect_plan().times(0);
        let sink = Arc::new(CollectingEventSink::new());
        let orchestrator = orchestrator(api).with_event_sink(sink.clone());

        let err = orchestrator.run(&CancellationToken::new()).await.unwrap_err();

        assert_eq!(err.status(), Some(500));
        let snapshot = orchestrator.snapshot();
        assert_eq!(
            snapshot.current_stage.failure_reason(),
            Some("Request to http://svc/api/profile failed with status: 500")
        );
        assert!(snapshot.upload.is_none());
        assert!(snapshot.metadata.is_none());
        assert!(snapshot.plan.is_none());
        assert!(!snapshot.is_running);
        assert_eq!(sink.events_of_type(types::PIPELINE_FAILED).len(), 1);
    }

    #[tokio::test]
    async fn test_profile_failure_resets_to_idle_when_configured() {
        let mut api = MockStageApi::new();
        api.expect_upload().returning(|_, _| Ok(sample_upload()));
        api.expect_profile().returning(|_, _| Err(server_error("/profile")));
        let orchestrator = orchestrator(api).with_options(OrchestratorOptions {
            fatal_policy: FatalPolicy::ResetToIdle,
            ..OrchestratorOptions::default()
        });

        orchestrator.run(&CancellationToken::new()).await.unwrap_err();

        let snapshot = orchestrator.snapshot();
        assert_eq!(snapshot.current_stage, PipelineStage::Idle);
        assert!(snapshot.metadata.is_none());
        assert!(snapshot.plan.is_none());
    }

    #[tokio::test]
    async fn test_cancelled_before_start_makes_no_calls() {
        let mut api = MockStageApi::new();
        api.expect_upload().times(0);
        let orchestrator = orchestrator(api);
        let cancel = CancellationToken::new();
        cancel.cancel("user abort");

        let err = orchestrator.run(&cancel).await.unwrap_err();

        assert!(err.is_cancelled());
        assert!(orchestrator.current_stage().is_failed());
        assert!(!orchestrator.is_running());
    }

    #[tokio::test]
    async fn test_cancel_during_tasks_keeps_published_artifacts() {
        let cancel = Arc::new(CancellationToken::new());
        let mut api = happy_stages(&["first", "second", "third"]);
        let trigger = cancel.clone();
        api.expect_execute_task().times(2).returning(move |task, _, _, _, _| {
            if task.name == "second" {
                trigger.cancel("user abort");
            }
            Ok(execution_with_stdout(&task.name, "ran"))
        });
        let orchestrator = orchestrator(api);

        let err = orchestrator.run(&cancel).await.unwrap_err();

        assert_eq!(err.to_string(), "Pipeline cancelled: user abort");
        let snapshot = orchestrator.snapshot();
        assert_eq!(snapshot.artifacts[0].filename, "Output: first");
        assert!(snapshot.artifacts.iter().all(|a| a.filename != "Output: third"));
        assert!(snapshot.plan.is_none());
        assert!(!snapshot.is_running);
    }

    #[tokio::test]
    async fn test_offline_mode_forwarded_and_locked_while_running() {
        let mut api = MockStageApi::new();
        api.expect_upload().returning(|_, _| Ok(sample_upload()));
        api.expect_profile().returning(|_, _| Ok(sample_profile()));
        api.expect_extract_metadata()
            .withf(|_, offline, _| *offline)
            .returning(|_, _, _| Ok(sample_metadata()));
        api.expect_plan()
            .withf(|_, _, offline, _| *offline)
            .returning(|_, _, _, _| Ok(plan_of(&[])));
        let orchestrator = orchestrator(api);
        orchestrator.set_offline_mode(true).unwrap();

        orchestrator.run(&CancellationToken::new()).await.unwrap();

        assert!(orchestrator.snapshot().offline_mode);
        assert_eq!(orchestrator.current_stage(), PipelineStage::Completed);
    }

    #[test]
    fn test_inputs_locked_while_running() {
        let orchestrator = orchestrator(MockStageApi::new());
        orchestrator.state.write().view.is_running = true;

        assert_eq!(orchestrator.select_input(sample_input()).unwrap_err().kind(), "precondition");
        assert_eq!(orchestrator.set_offline_mode(true).unwrap_err().kind(), "precondition");
        assert!(!orchestrator.snapshot().offline_mode);
    }

    #[tokio::test]
    async fn test_run_while_running_is_rejected() {
        let mut api = MockStageApi::new();
        api.expect_upload().times(0);
        let orchestrator = orchestrator(api);
        orchestrator.state.write().view.is_running = true;

        let err = orchestrator.run(&CancellationToken::new()).await.unwrap_err();

        assert_eq!(err.kind(), "precondition");
        assert!(orchestrator.is_running());
        assert!(orchestrator.snapshot().run_id.is_none());
    }

    #[tokio::test]
    async fn test_export_markdown_lists_artifacts() {
        let mut api = happy_stages(&["calories"]);
        api.expect_execute_task()
            .returning(|task, _, _, _, _| Ok(execution_with_artifact(&task.name)));
        let orchestrator = orchestrator(api);
        orchestrator.run(&CancellationToken::new()).await.unwrap();

        let doc = orchestrator.export_markdown("Recipes");

        assert!(doc.contains("## 1. calories.png"));
        assert!(doc.contains("**Observation:** calories observed"));
    }
}
