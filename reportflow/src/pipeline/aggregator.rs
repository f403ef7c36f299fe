//! Turns task results into the published artifact sequence.

use crate::core::{Artifact, ArtifactInsight, ExecutionResult, Insight};

/// Observation attached to file artifacts that came without insights.
pub const DEFAULT_OBSERVATION: &str = "Analysis complete.";

/// Filename prefix of artifacts built from standard output.
pub const STDOUT_FILENAME_PREFIX: &str = "Output: ";

/// Artifacts for one task result.
///
/// Files come first: one artifact per file, all sharing the task's insights.
/// A result with no files but non-empty stdout yields one text artifact.
/// Anything else yields nothing.
#[must_use]
pub fn artifacts_from_result(task_index: usize, result: &ExecutionResult) -> Vec<Artifact> {
    if !result.artifacts.is_empty() {
        let insight = match &result.insights {
            Some(value) if !value.is_null() => ArtifactInsight::from_value(value.clone()),
            _ => Insight::observation(DEFAULT_OBSERVATION).into(),
        };
        return result
            .artifacts
            .iter()
            .map(|file| Artifact::new(task_index, file.filename.clone(), file.content_base64.clone(), insight.clone()))
            .collect();
    }

    match result.stdout.as_deref() {
        Some(stdout) if !stdout.is_empty() => vec![Artifact::new(
            task_index,
            format!("{STDOUT_FILENAME_PREFIX}{}", result.task_name),
            None,
            Insight::observation(stdout),
        )],
        _ => Vec::new(),
    }
}

/// The artifact sequence of one run, ordered by task index.
#[derive(Debug, Clone, Default)]
pub struct ArtifactAggregator {
    artifacts: Vec<Artifact>,
}

impl ArtifactAggregator {
    /// Creates an empty aggregator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the artifacts of task `task_index` and returns the full sequence.
    ///
    /// New artifacts go after every artifact of an equal or lower task index,
    /// so sequential execution publishes in completion order and parallel
    /// execution still publishes in plan order.
    pub fn append(&mut self, task_index: usize, result: &ExecutionResult) -> Vec<Artifact> {
        let new = artifacts_from_result(task_index, result);
        if !new.is_empty() {
            let at = self.artifacts.partition_point(|a| a.task_index <= task_index);
            let tail = self.artifacts.split_off(at);
            self.artifacts.extend(new);
            self.artifacts.extend(tail);
        }
        self.artifacts.clone()
    }

    /// The current sequence.
    #[must_use]
    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    /// Number of artifacts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    /// Returns true if nothing was published.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Drops everything.
    pub fn clear(&mut self) {
        self.artifacts.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ArtifactFile;
    use crate::testing::{execution_with_artifact, execution_with_stdout};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_stdout_only_result() {
        let artifacts = artifacts_from_result(0, &execution_with_stdout("scan", "done"));
        assert_eq!(
            artifacts,
            vec![Artifact::new(0, "Output: scan", None, Insight::observation("done"))]
        );
    }

    #[test]
    fn test_files_share_insights() {
        let mut result = execution_with_artifact("hist");
        result.artifacts.push(ArtifactFile {
            filename: "hist.csv".to_string(),
            content_base64: None,
        });
        result.stdout = Some("ignored".to_string());

        let artifacts = artifacts_from_result(2, &result);

        assert_eq!(artifacts.len(), 2);
        assert_eq!(artifacts[0].filename, "hist.png");
        assert_eq!(artifacts[1].filename, "hist.csv");
        assert!(artifacts.iter().all(|a| a.task_index == 2));
        assert_eq!(artifacts[1].insight, artifacts[0].insight);
    }

    #[test]
    fn test_missing_insights_get_default_observation() {
        let mut result = execution_with_artifact("box");
        result.insights = None;
        let artifacts = artifacts_from_result(0, &result);
        assert_eq!(
            artifacts[0].insight,
            ArtifactInsight::from(Insight::observation(DEFAULT_OBSERVATION))
        );
    }

    #[test]
    fn test_unstructured_insights_kept_raw() {
        let mut result = execution_with_artifact("box");
        result.insights = Some(json!(["not", "structured"]));
        let artifacts = artifacts_from_result(0, &result);
        assert_eq!(artifacts[0].insight.as_value(), &json!(["not", "structured"]));
    }

    #[test]
    fn test_insights_stored_unchanged() {
        let insights = json!({
            "observation": "o",
            "confidence": 0.9,
            "actionable": [{"step": 1}, "re-run"]
        });
        let mut result = execution_with_artifact("box");
        result.insights = Some(insights.clone());

        let artifacts = artifacts_from_result(0, &result);

        assert_eq!(artifacts[0].insight.as_value(), &insights);
        let published = serde_json::to_value(&artifacts[0]).unwrap();
        assert_eq!(published["insight"], insights);
    }

    #[test]
    fn test_empty_result_yields_nothing() {
        assert!(artifacts_from_result(0, &execution_with_stdout("quiet", "")).is_empty());
        assert!(artifacts_from_result(0, &ExecutionResult::default()).is_empty());
    }

    #[test]
    fn test_append_keeps_task_order() {
        let mut aggregator = ArtifactAggregator::new();
        aggregator.append(2, &execution_with_artifact("c"));
        aggregator.append(0, &execution_with_artifact("a"));
        let all = aggregator.append(1, &execution_with_stdout("b", "b ran"));

        let names: Vec<&str> = all.iter().map(|a| a.filename.as_str()).collect();
        assert_eq!(names, vec!["a.png", "Output: b", "c.png"]);
        assert_eq!(aggregator.len(), 3);

        aggregator.clear();
        assert!(aggregator.is_empty());
    }

    #[test]
    fn test_append_returns_full_sequence() {
        let mut aggregator = ArtifactAggregator::new();
        aggregator.append(0, &execution_with_artifact("a"));
        let all = aggregator.append(1, &ExecutionResult::default());
        assert_eq!(all.len(), 1);
        assert_eq!(aggregator.artifacts(), &all[..]);
    }
}
