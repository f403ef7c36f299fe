//! Stage adapters: one call per remote pipeline stage.
//!
//! Adapters shape requests and normalize replies. Retries live in the
//! [`ResilientHttpClient`](crate::transport::ResilientHttpClient) underneath;
//! orchestration state lives above in the pipeline module.

mod http;
pub mod normalize;

pub use http::HttpStageApi;

use async_trait::async_trait;

use crate::cancellation::CancellationToken;
use crate::core::{ExecutionResult, InputFile, MetadataResult, Plan, ProfileResult, Task, UploadResult};
use crate::errors::Result;

/// The five remote stages.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StageApi: Send + Sync {
    /// Uploads the selected file.
    async fn upload(&self, input: &InputFile, cancel: &CancellationToken) -> Result<UploadResult>;

    /// Profiles the uploaded file.
    async fn profile(&self, upload: &UploadResult, cancel: &CancellationToken) -> Result<ProfileResult>;

    /// Extracts per-column semantic metadata.
    async fn extract_metadata(
        &self,
        profile: &ProfileResult,
        offline_mode: bool,
        cancel: &CancellationToken,
    ) -> Result<MetadataResult>;

    /// Plans the analysis tasks.
    async fn plan(
        &self,
        profile: &ProfileResult,
        metadata: &MetadataResult,
        offline_mode: bool,
        cancel: &CancellationToken,
    ) -> Result<Plan>;

    /// Executes one task against the uploaded data.
    async fn execute_task(
        &self,
        task: &Task,
        input: &InputFile,
        profile: &ProfileResult,
        offline_mode: bool,
        cancel: &CancellationToken,
    ) -> Result<ExecutionResult>;
}
