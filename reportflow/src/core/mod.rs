//! Core domain model types for reportflow.
//!
//! This module contains the fundamental types used throughout the crate:
//! - The pipeline stage enum
//! - Stage request/response models
//! - Aggregated artifacts and insights

mod artifact;
mod models;
mod stage;

pub use artifact::{Artifact, ArtifactInsight, Insight};
pub use models::{
    ArtifactFile, ColumnDescription, ExecutionResult, InputFile, MetadataResult, Plan,
    ProfileResult, Task, UploadResult,
};
pub use stage::PipelineStage;
