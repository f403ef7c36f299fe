//! # Reportflow
//!
//! Client-side orchestrator for a remote data-analysis pipeline.
//!
//! A run takes one user-supplied file through five remote stages:
//!
//! - **Upload**: the file is sent as a multipart form
//! - **Profile**: the service returns sample rows, statistics and a schema
//! - **Metadata**: per-column semantic descriptions
//! - **Plan**: a list of analysis tasks
//! - **Execute**: each task runs remotely and yields files, output and insights
//!
//! Every call goes through a [`ResilientHttpClient`](transport::ResilientHttpClient)
//! that retries 429, 5xx and network failures with exponential backoff.
//! Task results are folded into an ordered artifact sequence that observers
//! read through [`PipelineSnapshot`](pipeline::PipelineSnapshot)s and can
//! export as Markdown.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use reportflow::prelude::*;
//!
//! let config = ServiceConfig::single_host("http://localhost:8000/api");
//! let orchestrator = PipelineOrchestrator::from_config(&config)?;
//! orchestrator.select_input(InputFile::from_path("recipes.csv").await?)?;
//!
//! let summary = orchestrator.run(&CancellationToken::new()).await?;
//! println!("{}", orchestrator.export_markdown("Recipes"));
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod pipeline;
pub mod report;
pub mod stages;
pub mod testing;
pub mod transport;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::config::{FatalPolicy, ServiceConfig, StageEndpoint, Topology};
    pub use crate::core::{
        Artifact, ArtifactInsight, ExecutionResult, InputFile, Insight, MetadataResult, PipelineStage, Plan,
        ProfileResult, Task, UploadResult,
    };
    pub use crate::errors::{ErrorReport, ReportflowError, Result};
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::pipeline::{OrchestratorOptions, PipelineOrchestrator, PipelineSnapshot, RunSummary};
    pub use crate::stages::{HttpStageApi, StageApi};
    pub use crate::transport::{ReqwestTransport, ResilientHttpClient, RetryPolicy, Transport};
}
