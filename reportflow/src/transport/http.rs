//! Production transport backed by `reqwest`.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::time::Duration;
use tracing::debug;

use super::{HttpRequest, HttpResponse, RequestBody, Transport, TransportError};
use crate::errors::{ReportflowError, Result};

/// User agent sent with every request.
const USER_AGENT: &str = concat!("reportflow/", env!("CARGO_PKG_VERSION"));

/// HTTP transport with a per-request timeout.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds a transport whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ReportflowError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Wraps an existing client.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn classify(err: &reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(err.to_string())
    } else if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else if err.is_builder() {
        TransportError::InvalidRequest(err.to_string())
    } else {
        TransportError::Io(err.to_string())
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: &HttpRequest) -> std::result::Result<HttpResponse, TransportError> {
        let builder = self.client.post(&request.url);
        let builder = match &request.body {
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart(file) => {
                let mut part = Part::bytes(file.bytes.as_ref().clone()).file_name(file.file_name.clone());
                if let Some(content_type) = &file.content_type {
                    part = part
                        .mime_str(content_type)
                        .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
                }
                builder.multipart(Form::new().part(file.field.clone(), part))
            }
        };

        let response = builder.send().await.map_err(|e| classify(&e))?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| classify(&e))?;
        debug!(url = %request.url, status, bytes = body.len(), "Received response");

        Ok(HttpResponse { status, body })
    }
}
