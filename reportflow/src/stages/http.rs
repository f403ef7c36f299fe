//! [`StageApi`] over HTTP.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

use super::normalize::{
    normalize_execution, normalize_metadata, normalize_plan, normalize_profile, normalize_upload,
    plan_request_body,
};
use super::StageApi;
use crate::cancellation::CancellationToken;
use crate::config::{FieldRules, ServiceConfig, StageEndpoint};
use crate::core::{ExecutionResult, InputFile, MetadataResult, Plan, ProfileResult, Task, UploadResult};
use crate::errors::Result;
use crate::transport::{HttpRequest, MultipartFile, ReqwestTransport, ResilientHttpClient};

/// Multipart field carrying the uploaded file.
const UPLOAD_FIELD: &str = "file";

#[derive(Serialize)]
struct ProfileRequest<'a> {
    file_path: &'a str,
}

#[derive(Serialize)]
struct MetadataRequest<'a> {
    sample_data: &'a Value,
    description: &'a Value,
    schema_info: &'a Map<String, Value>,
    offline_mode: bool,
}

#[derive(Serialize)]
struct ExecuteRequest<'a> {
    task: &'a Task,
    sandbox_data_path: String,
    sample_data: &'a Value,
    description: &'a Value,
    schema_info: &'a Map<String, Value>,
    offline_mode: bool,
}

/// Calls the remote stages described by a [`ServiceConfig`].
#[derive(Debug, Clone)]
pub struct HttpStageApi {
    client: ResilientHttpClient,
    config: ServiceConfig,
    fields: FieldRules,
}

impl HttpStageApi {
    /// Creates the adapters over an existing client.
    #[must_use]
    pub fn new(client: ResilientHttpClient, config: ServiceConfig) -> Self {
        let fields = config.fields();
        Self { client, config, fields }
    }

    /// Validates `config` and builds a reqwest-backed client from it.
    pub fn from_config(config: ServiceConfig) -> Result<Self> {
        config.validate()?;
        let transport = ReqwestTransport::new(config.request_timeout())?;
        let client = ResilientHttpClient::new(Arc::new(transport), config.retry.clone());
        Ok(Self::new(client, config))
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Path the execution sandbox sees for `input`.
    #[must_use]
    pub fn sandbox_data_path(&self, input: &InputFile) -> String {
        format!("{}{}", self.config.sandbox_data_prefix, input.name())
    }

    async fn post_json(
        &self,
        stage: StageEndpoint,
        body: impl Serialize + Send,
        cancel: &CancellationToken,
    ) -> Result<(String, Value)> {
        let url = self.config.url(stage);
        debug!(stage = %stage, url = %url, "Calling stage");
        let request = HttpRequest::json(url.clone(), serde_json::to_value(body)?);
        let value = self.client.send(&request, cancel).await?;
        Ok((url, value))
    }
}

#[async_trait]
impl StageApi for HttpStageApi {
    async fn upload(&self, input: &InputFile, cancel: &CancellationToken) -> Result<UploadResult> {
        let url = self.config.url(StageEndpoint::Upload);
        debug!(url = %url, file = input.name(), bytes = input.len(), "Uploading input");
        let file = MultipartFile {
            field: UPLOAD_FIELD.to_string(),
            file_name: input.name().to_string(),
            bytes: Arc::new(input.bytes().to_vec()),
            content_type: input.content_type().map(str::to_string),
        };
        let value = self.client.send(&HttpRequest::multipart(url.clone(), file), cancel).await?;
        normalize_upload(&url, value)
    }

    async fn profile(&self, upload: &UploadResult, cancel: &CancellationToken) -> Result<ProfileResult> {
        let body = ProfileRequest {
            file_path: &upload.remote_file_path,
        };
        let (url, value) = self.post_json(StageEndpoint::Profile, body, cancel).await?;
        normalize_profile(&url, value)
    }

    async fn extract_metadata(
        &self,
        profile: &ProfileResult,
        offline_mode: bool,
        cancel: &CancellationToken,
    ) -> Result<MetadataResult> {
        let body = MetadataRequest {
            sample_data: &profile.sample_data,
            description: &profile.description,
            schema_info: &profile.schema_info,
            offline_mode,
        };
        let (_, value) = self.post_json(StageEndpoint::Metadata, body, cancel).await?;
        Ok(normalize_metadata(value, &self.fields.metadata_columns_keys))
    }

    async fn plan(
        &self,
        profile: &ProfileResult,
        metadata: &MetadataResult,
        offline_mode: bool,
        cancel: &CancellationToken,
    ) -> Result<Plan> {
        let body = plan_request_body(profile, metadata, &self.fields.plan_description_field, offline_mode);
        let (_, value) = self.post_json(StageEndpoint::Plan, body, cancel).await?;
        Ok(normalize_plan(value))
    }

    async fn execute_task(
        &self,
        task: &Task,
        input: &InputFile,
        profile: &ProfileResult,
        offline_mode: bool,
        cancel: &CancellationToken,
    ) -> Result<ExecutionResult> {
        let body = ExecuteRequest {
            task,
            sandbox_data_path: self.sandbox_data_path(input),
            sample_data: &profile.sample_data,
            description: &profile.description,
            schema_info: &profile.schema_info,
            offline_mode,
        };
        let (url, value) = self.post_json(StageEndpoint::Execute, body, cancel).await?;
        normalize_execution(&url, value, task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_input, sample_metadata, sample_profile, sample_upload, ScriptedReply, ScriptedTransport};
    use crate::transport::{RequestBody, RetryPolicy};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn api(transport: &Arc<ScriptedTransport>, config: ServiceConfig) -> HttpStageApi {
        let client = ResilientHttpClient::new(transport.clone(), RetryPolicy::none());
        HttpStageApi::new(client, config)
    }

    #[tokio::test]
    async fn test_upload_sends_multipart_file() {
        let transport = Arc::new(
            ScriptedTransport::new().on("/upload", [ScriptedReply::ok(json!({"file_path": "/srv/recipes.csv"}))]),
        );
        let stages = api(&transport, ServiceConfig::single_host("http://svc/api"));

        let upload = stages.upload(&sample_input(), &CancellationToken::new()).await.unwrap();

        assert_eq!(upload.remote_file_path, "/srv/recipes.csv");
        let calls = transport.calls();
        assert_eq!(calls[0].url, "http://svc/api/upload");
        match &calls[0].body {
            RequestBody::Multipart(file) => {
                assert_eq!(file.field, "file");
                assert_eq!(file.file_name, "recipes.csv");
                assert_eq!(file.content_type.as_deref(), Some("text/csv"));
            }
            RequestBody::Json(_) => panic!("upload must be multipart"),
        }
    }

    #[tokio::test]
    async fn test_profile_sends_remote_path() {
        let transport = Arc::new(ScriptedTransport::new().on(
            "/profile",
            [ScriptedReply::ok(json!({"sample_data": [], "description": {}, "schema_info": {"a": "Int64"}}))],
        ));
        let stages = api(&transport, ServiceConfig::default());

        let profile = stages.profile(&sample_upload(), &CancellationToken::new()).await.unwrap();

        assert_eq!(profile.schema_info.get("a"), Some(&json!("Int64")));
        assert_eq!(
            transport.calls()[0].json(),
            Some(&json!({"file_path": "/srv/data/recipes.csv"}))
        );
    }

    #[tokio::test]
    async fn test_offline_mode_forwarded() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .on("/metadata", [ScriptedReply::ok(json!({"columns": []}))])
                .on("/supervisor", [ScriptedReply::ok(json!({"tasks": []}))])
                .on("/execute_task", [ScriptedReply::ok(json!({"task_name": "t"}))]),
        );
        let stages = api(&transport, ServiceConfig::default());
        let cancel = CancellationToken::new();
        let profile = sample_profile();

        stages.extract_metadata(&profile, true, &cancel).await.unwrap();
        stages.plan(&profile, &sample_metadata(), true, &cancel).await.unwrap();
        stages
            .execute_task(&Task::new("t", "d"), &sample_input(), &profile, true, &cancel)
            .await
            .unwrap();

        for call in transport.calls() {
            assert_eq!(call.json().and_then(|b| b.get("offline_mode")), Some(&json!(true)));
        }
    }

    #[tokio::test]
    async fn test_execute_body_shape() {
        let transport = Arc::new(ScriptedTransport::new().on("/execute_task", [ScriptedReply::ok(json!({}))]));
        let stages = api(&transport, ServiceConfig::default());
        let task = Task::new("scan", "Scan rows").with_parameter("limit", json!(10));

        let result = stages
            .execute_task(&task, &sample_input(), &sample_profile(), false, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.task_name, "scan");
        let body = transport.calls()[0].json().cloned().unwrap();
        assert_eq!(body["task"], json!({"name": "scan", "description": "Scan rows", "limit": 10}));
        assert_eq!(body["sandbox_data_path"], json!("/sandbox/data/recipes.csv"));
        assert_eq!(body["schema_info"], json!({"name": "String", "calories": "Int64"}));
    }

    #[tokio::test]
    async fn test_split_topology_routes_and_fields() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .on("/agents/metadata/run", [ScriptedReply::ok(json!([{"name": "calories"}]))])
                .on("/agents/supervisor/run", [ScriptedReply::ok(json!([{"name": "trend"}]))]),
        );
        let stages = api(&transport, ServiceConfig::split("http://sidecar", "https://backend"));
        let cancel = CancellationToken::new();
        let profile = sample_profile();

        let metadata = stages.extract_metadata(&profile, false, &cancel).await.unwrap();
        let plan = stages.plan(&profile, &metadata, false, &cancel).await.unwrap();

        assert_eq!(plan.tasks[0].name, "trend");
        let calls = transport.calls();
        assert_eq!(calls[0].url, "https://backend/agents/metadata/run");
        assert_eq!(calls[1].url, "https://backend/agents/supervisor/run");
        let plan_body = calls[1].json().unwrap();
        assert_eq!(plan_body.get("description"), Some(&json!([{"name": "calories"}])));
        assert!(plan_body.get("supervisor_description").is_none());
    }

    #[tokio::test]
    async fn test_status_error_surfaces() {
        let transport = Arc::new(ScriptedTransport::new().on("/profile", [ScriptedReply::status(422)]));
        let stages = api(&transport, ServiceConfig::default());

        let err = stages.profile(&sample_upload(), &CancellationToken::new()).await.unwrap_err();
        assert_eq!(err.status(), Some(422));
    }
}
