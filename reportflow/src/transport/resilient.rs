//! HTTP client that retries transient failures.

use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use super::retry::{RetryDecision, RetryPolicy};
use super::{HttpRequest, HttpResponse, Transport, TransportError};
use crate::cancellation::CancellationToken;
use crate::errors::{ReportflowError, Result};

/// Why a single attempt failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptFailure {
    /// A response arrived with a non-success status.
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },
    /// No response arrived.
    Transport(TransportError),
}

impl AttemptFailure {
    /// Whether another attempt could succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status { status, .. } => RetryPolicy::is_retryable_status(*status),
            Self::Transport(err) => err.is_network(),
        }
    }

    fn into_error(self, url: &str) -> ReportflowError {
        match self {
            Self::Status { status, body } => ReportflowError::HttpStatus {
                status,
                url: url.to_string(),
                body,
            },
            Self::Transport(TransportError::InvalidRequest(message)) => ReportflowError::InvalidRequest {
                url: url.to_string(),
                message,
            },
            Self::Transport(err) => ReportflowError::Network {
                url: url.to_string(),
                message: err.to_string(),
            },
        }
    }
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status { status, .. } => write!(f, "status {status}"),
            Self::Transport(err) => write!(f, "{err}"),
        }
    }
}

/// Sends requests through a [`Transport`], retrying 429, 5xx and network
/// failures according to a [`RetryPolicy`].
///
/// Every stage call goes through the same client, so the policy is uniform
/// across the pipeline.
#[derive(Clone)]
pub struct ResilientHttpClient {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
}

impl fmt::Debug for ResilientHttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResilientHttpClient")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl ResilientHttpClient {
    /// Creates a client over `transport`.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    /// The active retry policy.
    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Sends `request` and decodes the JSON reply.
    ///
    /// Fails with [`ReportflowError::HttpStatus`] or [`ReportflowError::Network`]
    /// once retries are exhausted or the failure is not transient, with
    /// [`ReportflowError::InvalidRequest`] if the request could not be built,
    /// with [`ReportflowError::Decode`] if a success body is not JSON, and with
    /// [`ReportflowError::Cancelled`] if `cancel` fires first.
    pub async fn send(&self, request: &HttpRequest, cancel: &CancellationToken) -> Result<Value> {
        let mut retries_used = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(cancel.to_error());
            }

            let outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(cancel.to_error()),
                outcome = self.transport.execute(request) => outcome,
            };

            let failure = match outcome {
                Ok(response) if response.is_success() => return decode(&request.url, &response),
                Ok(response) => AttemptFailure::Status {
                    status: response.status,
                    body: response.body,
                },
                Err(err) => AttemptFailure::Transport(err),
            };

            match self.policy.decide(retries_used, failure.is_retryable()) {
                RetryDecision::Retry(delay) => {
                    warn!(
                        url = %request.url,
                        retry = retries_used + 1,
                        max_retries = self.policy.max_retries,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        reason = %failure,
                        "Request failed, retrying"
                    );
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => return Err(cancel.to_error()),
                        () = tokio::time::sleep(delay) => {}
                    }
                    retries_used += 1;
                }
                RetryDecision::GiveUp | RetryDecision::NotRetryable => {
                    debug!(url = %request.url, retries_used, reason = %failure, "Giving up on request");
                    return Err(failure.into_error(&request.url));
                }
            }
        }
    }
}

fn decode(url: &str, response: &HttpResponse) -> Result<Value> {
    if response.body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&response.body).map_err(|e| ReportflowError::decode(url, e.to_string()))
}
