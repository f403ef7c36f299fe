//! Pipeline stage enum.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a pipeline run currently stands.
///
/// Advances monotonically from `Idle` to `Completed` during a run. A fatal
/// failure in upload, profile, metadata or planning moves to `Failed` (or
/// back to `Idle`, depending on [`FatalPolicy`](crate::config::FatalPolicy)).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum PipelineStage {
    /// No run in progress.
    #[default]
    Idle,
    /// The input file reached the remote service.
    Uploaded,
    /// Profiling results are available.
    Profiled,
    /// Semantic column metadata is available.
    MetadataExtracted,
    /// The task plan is available.
    Planned,
    /// Tasks are being executed.
    Executing,
    /// Every planned task was attempted.
    Completed,
    /// The run aborted before execution could finish.
    Failed {
        /// Why the run aborted.
        reason: String,
    },
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Uploaded => write!(f, "uploaded"),
            Self::Profiled => write!(f, "profiled"),
            Self::MetadataExtracted => write!(f, "metadata_extracted"),
            Self::Planned => write!(f, "planned"),
            Self::Executing => write!(f, "executing"),
            Self::Completed => write!(f, "completed"),
            Self::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}

impl PipelineStage {
    /// Position along the happy path. `Failed` sorts after everything.
    #[must_use]
    pub fn ordinal(&self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Uploaded => 1,
            Self::Profiled => 2,
            Self::MetadataExtracted => 3,
            Self::Planned => 4,
            Self::Executing => 5,
            Self::Completed => 6,
            Self::Failed { .. } => 7,
        }
    }

    /// Returns true if the run ended, successfully or not.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed { .. })
    }

    /// Returns true for the failed state.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Returns true if the happy path has progressed at least to `other`.
    ///
    /// A failed run has reached nothing.
    #[must_use]
    pub fn has_reached(&self, other: &Self) -> bool {
        !self.is_failed() && !other.is_failed() && self.ordinal() >= other.ordinal()
    }

    /// The failure reason, if failed.
    #[must_use]
    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            Self::Failed { reason } => Some(reason),
            _ => None,
        }
    }
}
