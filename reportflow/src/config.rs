//! Service configuration: where each stage lives and how replies are read.
//!
//! Two deployment topologies exist. In the single-host layout every stage is
//! served under one base URL. In the split layout upload, profile and execute
//! go to a local sidecar while metadata and planning go to a backend. Paths
//! and field names differ between the two, so both are plain configuration
//! with a preset per topology.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::errors::{ReportflowError, Result};
use crate::transport::RetryPolicy;

/// Prefix of all environment variables read by [`ServiceConfig::from_env`].
pub const ENV_PREFIX: &str = "REPORTFLOW_";

/// The five remote stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageEndpoint {
    /// Multipart file upload.
    Upload,
    /// Data profiling.
    Profile,
    /// Semantic metadata extraction.
    Metadata,
    /// Task planning.
    Plan,
    /// Single task execution.
    Execute,
}

impl StageEndpoint {
    /// All stages in pipeline order.
    pub const ALL: [Self; 5] = [
        Self::Upload,
        Self::Profile,
        Self::Metadata,
        Self::Plan,
        Self::Execute,
    ];

    /// Lowercase stage name used in logs and failure reasons.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::Profile => "profile",
            Self::Metadata => "metadata",
            Self::Plan => "plan",
            Self::Execute => "execute",
        }
    }
}

impl std::fmt::Display for StageEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Where the services are deployed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Topology {
    /// Every stage under one base URL.
    Single {
        /// Base URL, e.g. `http://localhost:8000/api`.
        base_url: String,
    },
    /// Upload, profile and execute on the sidecar; metadata and plan on the backend.
    Split {
        /// Sidecar base URL.
        sidecar_url: String,
        /// Backend base URL.
        backend_url: String,
    },
}

impl Topology {
    /// Base URL serving `stage`.
    #[must_use]
    pub fn base_url(&self, stage: StageEndpoint) -> &str {
        match self {
            Self::Single { base_url } => base_url,
            Self::Split {
                sidecar_url,
                backend_url,
            } => match stage {
                StageEndpoint::Metadata | StageEndpoint::Plan => backend_url,
                StageEndpoint::Upload | StageEndpoint::Profile | StageEndpoint::Execute => sidecar_url,
            },
        }
    }

    fn urls(&self) -> Vec<&str> {
        match self {
            Self::Single { base_url } => vec![base_url.as_str()],
            Self::Split {
                sidecar_url,
                backend_url,
            } => vec![sidecar_url.as_str(), backend_url.as_str()],
        }
    }
}

/// Per-stage request paths, appended to the topology's base URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointPaths {
    /// Upload path.
    pub upload: String,
    /// Profile path.
    pub profile: String,
    /// Metadata path.
    pub metadata: String,
    /// Plan path.
    pub plan: String,
    /// Execute path.
    pub execute: String,
}

impl EndpointPaths {
    /// Paths of the single-host layout.
    #[must_use]
    pub fn single_host() -> Self {
        Self {
            upload: "/upload".to_string(),
            profile: "/profile".to_string(),
            metadata: "/metadata".to_string(),
            plan: "/supervisor".to_string(),
            execute: "/execute_task".to_string(),
        }
    }

    /// Paths of the split layout.
    #[must_use]
    pub fn split() -> Self {
        Self {
            metadata: "/agents/metadata/run".to_string(),
            plan: "/agents/supervisor/run".to_string(),
            ..Self::single_host()
        }
    }

    /// Path for `stage`.
    #[must_use]
    pub fn path(&self, stage: StageEndpoint) -> &str {
        match stage {
            StageEndpoint::Upload => &self.upload,
            StageEndpoint::Profile => &self.profile,
            StageEndpoint::Metadata => &self.metadata,
            StageEndpoint::Plan => &self.plan,
            StageEndpoint::Execute => &self.execute,
        }
    }
}

/// Field-name reconciliation between the layouts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRules {
    /// Keys searched, in order, for the column list in a metadata reply.
    pub metadata_columns_keys: Vec<String>,
    /// Request field carrying the column descriptions to the planner.
    pub plan_description_field: String,
}

impl FieldRules {
    /// Rules of the single-host layout.
    #[must_use]
    pub fn single_host() -> Self {
        Self {
            metadata_columns_keys: vec!["supervisor_description".to_string(), "columns".to_string()],
            plan_description_field: "supervisor_description".to_string(),
        }
    }

    /// Rules of the split layout.
    #[must_use]
    pub fn split() -> Self {
        Self {
            plan_description_field: "description".to_string(),
            ..Self::single_host()
        }
    }
}

/// What the orchestrator does with its stage after a fatal failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FatalPolicy {
    /// Move to `Failed { reason }`, kept until the next run.
    #[default]
    MarkFailed,
    /// Return to `Idle`, discarding the reason.
    ResetToIdle,
}

/// Complete client-side configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Deployment layout.
    #[serde(default = "default_topology")]
    pub topology: Topology,
    /// Explicit paths; `None` uses the preset for the topology.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoints: Option<EndpointPaths>,
    /// Explicit field rules; `None` uses the preset for the topology.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldRules>,
    /// Retry policy shared by all stages.
    #[serde(default)]
    pub retry: RetryPolicy,
    /// Per-request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Prefix of the sandbox path sent with each task.
    #[serde(default = "default_sandbox_data_prefix")]
    pub sandbox_data_prefix: String,
    /// Tasks executed at once.
    #[serde(default = "default_task_concurrency")]
    pub task_concurrency: usize,
    /// Stage handling after a fatal failure.
    #[serde(default)]
    pub fatal_policy: FatalPolicy,
    /// Initial value of the offline-mode flag.
    #[serde(default)]
    pub offline_mode: bool,
}

fn default_topology() -> Topology {
    Topology::Single {
        base_url: "http://localhost:8000/api".to_string(),
    }
}

fn default_request_timeout_ms() -> u64 {
    120_000
}

fn default_sandbox_data_prefix() -> String {
    "/sandbox/data/".to_string()
}

fn default_task_concurrency() -> usize {
    1
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            topology: default_topology(),
            endpoints: None,
            fields: None,
            retry: RetryPolicy::default(),
            request_timeout_ms: default_request_timeout_ms(),
            sandbox_data_prefix: default_sandbox_data_prefix(),
            task_concurrency: default_task_concurrency(),
            fatal_policy: FatalPolicy::default(),
            offline_mode: false,
        }
    }
}

impl ServiceConfig {
    /// Single-host configuration.
    #[must_use]
    pub fn single_host(base_url: impl Into<String>) -> Self {
        Self {
            topology: Topology::Single {
                base_url: base_url.into(),
            },
            ..Self::default()
        }
    }

    /// Split sidecar/backend configuration.
    #[must_use]
    pub fn split(sidecar_url: impl Into<String>, backend_url: impl Into<String>) -> Self {
        Self {
            topology: Topology::Split {
                sidecar_url: sidecar_url.into(),
                backend_url: backend_url.into(),
            },
            ..Self::default()
        }
    }

    /// Parses a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ReportflowError::Config(format!("invalid config: {e}")))
    }

    /// Loads a JSON config file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::from_json_str(&text)
    }

    /// Default configuration with `REPORTFLOW_*` environment overrides.
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Applies `REPORTFLOW_*` overrides read through `lookup`.
    ///
    /// `BASE_URL` selects the single-host layout; `SIDECAR_URL` together with
    /// `BACKEND_URL` selects the split layout.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}")).filter(|v| !v.trim().is_empty());

        if let Some(base_url) = var("BASE_URL") {
            self.topology = Topology::Single { base_url };
        }
        match (var("SIDECAR_URL"), var("BACKEND_URL")) {
            (Some(sidecar_url), Some(backend_url)) => {
                self.topology = Topology::Split {
                    sidecar_url,
                    backend_url,
                };
            }
            (None, None) => {}
            _ => {
                return Err(ReportflowError::Config(format!(
                    "{ENV_PREFIX}SIDECAR_URL and {ENV_PREFIX}BACKEND_URL must be set together"
                )))
            }
        }
        if let Some(v) = var("MAX_RETRIES") {
            self.retry.max_retries = parse_env("MAX_RETRIES", &v)?;
        }
        if let Some(v) = var("INITIAL_BACKOFF_MS") {
            self.retry.initial_backoff_ms = parse_env("INITIAL_BACKOFF_MS", &v)?;
        }
        if let Some(v) = var("TIMEOUT_MS") {
            self.request_timeout_ms = parse_env("TIMEOUT_MS", &v)?;
        }
        if let Some(v) = var("TASK_CONCURRENCY") {
            self.task_concurrency = parse_env("TASK_CONCURRENCY", &v)?;
        }
        if let Some(v) = var("OFFLINE_MODE") {
            self.offline_mode = parse_env("OFFLINE_MODE", &v)?;
        }
        if let Some(v) = var("SANDBOX_DATA_PREFIX") {
            self.sandbox_data_prefix = v;
        }
        Ok(self)
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn with_request_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.request_timeout_ms = timeout_ms;
        self
    }

    /// Sets the number of concurrently executed tasks.
    #[must_use]
    pub fn with_task_concurrency(mut self, concurrency: usize) -> Self {
        self.task_concurrency = concurrency;
        self
    }

    /// Sets the fatal-failure policy.
    #[must_use]
    pub fn with_fatal_policy(mut self, policy: FatalPolicy) -> Self {
        self.fatal_policy = policy;
        self
    }

    /// Sets the initial offline-mode flag.
    #[must_use]
    pub fn with_offline_mode(mut self, offline: bool) -> Self {
        self.offline_mode = offline;
        self
    }

    /// Overrides the endpoint paths.
    #[must_use]
    pub fn with_endpoints(mut self, endpoints: EndpointPaths) -> Self {
        self.endpoints = Some(endpoints);
        self
    }

    /// Overrides the field rules.
    #[must_use]
    pub fn with_fields(mut self, fields: FieldRules) -> Self {
        self.fields = Some(fields);
        self
    }

    /// Effective endpoint paths.
    #[must_use]
    pub fn endpoints(&self) -> EndpointPaths {
        self.endpoints.clone().unwrap_or_else(|| match self.topology {
            Topology::Single { .. } => EndpointPaths::single_host(),
            Topology::Split { .. } => EndpointPaths::split(),
        })
    }

    /// Effective field rules.
    #[must_use]
    pub fn fields(&self) -> FieldRules {
        self.fields.clone().unwrap_or_else(|| match self.topology {
            Topology::Single { .. } => FieldRules::single_host(),
            Topology::Split { .. } => FieldRules::split(),
        })
    }

    /// Absolute URL for `stage`.
    #[must_use]
    pub fn url(&self, stage: StageEndpoint) -> String {
        join_url(self.topology.base_url(stage), self.endpoints().path(stage))
    }

    /// Per-request timeout as a duration.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Rejects configurations that cannot work.
    pub fn validate(&self) -> Result<()> {
        for url in self.topology.urls() {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ReportflowError::Config(format!(
                    "base URL must start with http:// or https://, got {url:?}"
                )));
            }
        }
        if self.task_concurrency == 0 {
            return Err(ReportflowError::Config("task_concurrency must be at least 1".to_string()));
        }
        if self.request_timeout_ms == 0 {
            return Err(ReportflowError::Config("request_timeout_ms must be positive".to_string()));
        }
        if self.retry.backoff_multiplier == 0 {
            return Err(ReportflowError::Config("backoff_multiplier must be at least 1".to_string()));
        }
        if self.fields().metadata_columns_keys.is_empty() {
            return Err(ReportflowError::Config("metadata_columns_keys must not be empty".to_string()));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| ReportflowError::Config(format!("{ENV_PREFIX}{name}={value:?}: {e}")))
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[test]
    fn test_default_is_single_host() {
        let config = ServiceConfig::default();
        assert_eq!(config.url(StageEndpoint::Upload), "http://localhost:8000/api/upload");
        assert_eq!(config.url(StageEndpoint::Plan), "http://localhost:8000/api/supervisor");
        assert_eq!(config.fields().plan_description_field, "supervisor_description");
        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(config.task_concurrency, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_split_routes_by_stage() {
        let config = ServiceConfig::split("http://localhost:8000/api/", "https://backend.example");

        assert_eq!(config.url(StageEndpoint::Upload), "http://localhost:8000/api/upload");
        assert_eq!(config.url(StageEndpoint::Execute), "http://localhost:8000/api/execute_task");
        assert_eq!(
            config.url(StageEndpoint::Metadata),
            "https://backend.example/agents/metadata/run"
        );
        assert_eq!(
            config.url(StageEndpoint::Plan),
            "https://backend.example/agents/supervisor/run"
        );
        assert_eq!(config.fields().plan_description_field, "description");
    }

    #[test]
    fn test_explicit_endpoints_win_over_preset() {
        let config = ServiceConfig::split("http://a", "http://b").with_endpoints(EndpointPaths::single_host());
        assert_eq!(config.url(StageEndpoint::Metadata), "http://b/metadata");
    }

    #[test]
    fn test_from_json_with_defaults() {
        let config = ServiceConfig::from_json_str(
            r#"{
                "topology": {"kind": "split", "sidecar_url": "http://s", "backend_url": "http://b"},
                "retry": {"max_retries": 1},
                "fatal_policy": "reset_to_idle"
            }"#,
        )
        .unwrap();

        assert_eq!(config.retry.max_retries, 1);
        assert_eq!(config.retry.initial_backoff_ms, 1000);
        assert_eq!(config.fatal_policy, FatalPolicy::ResetToIdle);
        assert_eq!(config.request_timeout_ms, 120_000);
        assert_eq!(config.endpoints(), EndpointPaths::split());
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let err = ServiceConfig::from_json_str("{").unwrap_err();
        assert_eq!(err.kind(), "config");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("REPORTFLOW_SIDECAR_URL", "http://127.0.0.1:8000/api"),
            ("REPORTFLOW_BACKEND_URL", "https://remote"),
            ("REPORTFLOW_MAX_RETRIES", "5"),
            ("REPORTFLOW_OFFLINE_MODE", "true"),
            ("REPORTFLOW_TASK_CONCURRENCY", "4"),
        ]
        .into_iter()
        .collect();

        let config = ServiceConfig::default()
            .with_env_overrides(|k| env.get(k).map(ToString::to_string))
            .unwrap();

        assert!(matches!(config.topology, Topology::Split { .. }));
        assert_eq!(config.retry.max_retries, 5);
        assert!(config.offline_mode);
        assert_eq!(config.task_concurrency, 4);
    }

    #[test]
    fn test_env_half_split_rejected() {
        let err = ServiceConfig::default()
            .with_env_overrides(|k| (k == "REPORTFLOW_SIDECAR_URL").then(|| "http://s".to_string()))
            .unwrap_err();
        assert_eq!(err.kind(), "config");
    }

    #[test]
    fn test_env_bad_number_rejected() {
        let err = ServiceConfig::default()
            .with_env_overrides(|k| (k == "REPORTFLOW_MAX_RETRIES").then(|| "many".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("REPORTFLOW_MAX_RETRIES"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(ServiceConfig::single_host("localhost:8000").validate().is_err());
        assert!(ServiceConfig::default().with_task_concurrency(0).validate().is_err());
        assert!(ServiceConfig::default()
            .with_retry(RetryPolicy::default().with_backoff_multiplier(0))
            .validate()
            .is_err());
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reportflow.json");
        tokio::fs::write(&path, r#"{"topology": {"kind": "single", "base_url": "http://svc"}}"#)
            .await
            .unwrap();

        let config = ServiceConfig::load(&path).await.unwrap();
        assert_eq!(config.url(StageEndpoint::Profile), "http://svc/profile");
    }
}
