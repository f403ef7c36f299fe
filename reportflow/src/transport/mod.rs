//! HTTP transport and retry handling.
//!
//! This module provides:
//! - The [`Transport`] trait, the seam between stage adapters and the network
//! - [`ReqwestTransport`], the production implementation
//! - [`RetryPolicy`] and [`ResilientHttpClient`], which retry transient failures

mod http;
mod resilient;
mod retry;

pub use http::ReqwestTransport;
pub use resilient::{AttemptFailure, ResilientHttpClient};
pub use retry::{RetryDecision, RetryPolicy};

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// A file sent as one multipart form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartFile {
    /// Form field name.
    pub field: String,
    /// File name reported to the server.
    pub file_name: String,
    /// File contents.
    pub bytes: Arc<Vec<u8>>,
    /// Optional MIME type.
    pub content_type: Option<String>,
}

/// Body of an outgoing request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// JSON document.
    Json(Value),
    /// Multipart form with a single file field.
    Multipart(MultipartFile),
}

/// An outgoing POST request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// Absolute target URL.
    pub url: String,
    /// Request body.
    pub body: RequestBody,
}

impl HttpRequest {
    /// Creates a JSON POST request.
    #[must_use]
    pub fn json(url: impl Into<String>, body: Value) -> Self {
        Self {
            url: url.into(),
            body: RequestBody::Json(body),
        }
    }

    /// Creates a multipart POST request.
    #[must_use]
    pub fn multipart(url: impl Into<String>, file: MultipartFile) -> Self {
        Self {
            url: url.into(),
            body: RequestBody::Multipart(file),
        }
    }

    /// The JSON body, if this is a JSON request.
    #[must_use]
    pub fn json_body(&self) -> Option<&Value> {
        match &self.body {
            RequestBody::Json(value) => Some(value),
            RequestBody::Multipart(_) => None,
        }
    }
}

/// A response that was received, whatever its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body as text.
    pub body: String,
}

impl HttpResponse {
    /// Creates a response.
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the status is 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Failure before any response was received.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The connection could not be established.
    #[error("connection failed: {0}")]
    Connect(String),
    /// The request exceeded its timeout.
    #[error("request timed out: {0}")]
    Timeout(String),
    /// The connection broke mid-exchange.
    #[error("transport failure: {0}")]
    Io(String),
    /// The request itself could not be built.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl TransportError {
    /// Network-level failures are worth retrying; malformed requests are not.
    #[must_use]
    pub fn is_network(&self) -> bool {
        !matches!(self, Self::InvalidRequest(_))
    }
}

/// Sends a single request, without retries.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Executes the request and returns the response whatever its status.
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

#[async_trait]
impl Transport for Arc<dyn Transport> {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).execute(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_success_range() {
        assert!(HttpResponse::new(200, "").is_success());
        assert!(HttpResponse::new(204, "").is_success());
        assert!(!HttpResponse::new(302, "").is_success());
        assert!(!HttpResponse::new(500, "").is_success());
    }

    #[test]
    fn test_transport_error_classification() {
        assert!(TransportError::Connect("refused".into()).is_network());
        assert!(TransportError::Timeout("120s".into()).is_network());
        assert!(TransportError::Io("reset".into()).is_network());
        assert!(!TransportError::InvalidRequest("bad mime".into()).is_network());
    }
}
