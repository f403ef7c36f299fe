//! Error types for the reportflow pipeline.
//!
//! Transport failures are classified structurally: a request that never
//! produced a response is a [`ReportflowError::Network`], a final non-2xx
//! response is a [`ReportflowError::HttpStatus`]. The orchestrator adds
//! [`ReportflowError::Precondition`] and [`ReportflowError::Cancelled`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Convenience result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ReportflowError>;

/// The main error type for reportflow operations.
#[derive(Debug, Error)]
pub enum ReportflowError {
    /// The request never completed (connection refused, reset, timed out).
    #[error("Network error calling {url}: {message}")]
    Network {
        /// Target URL.
        url: String,
        /// Last observed transport error message.
        message: String,
    },

    /// The final response carried a non-success status.
    #[error("Request to {url} failed with status: {status}")]
    HttpStatus {
        /// Last observed HTTP status code.
        status: u16,
        /// Target URL.
        url: String,
        /// Response body, kept for diagnostics.
        body: String,
    },

    /// A run was requested without input or while another run was active.
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// The run was cancelled through its token.
    #[error("Pipeline cancelled: {0}")]
    Cancelled(String),

    /// The request could not be built, so it was never sent.
    #[error("Invalid request to {url}: {message}")]
    InvalidRequest {
        /// Target URL.
        url: String,
        /// Builder message.
        message: String,
    },

    /// A success response could not be interpreted.
    #[error("Failed to decode response from {url}: {message}")]
    Decode {
        /// Target URL.
        url: String,
        /// Decoder message.
        message: String,
    },

    /// Invalid service configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for ReportflowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl ReportflowError {
    /// Creates a precondition error.
    #[must_use]
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }

    /// Creates a decode error for a response from `url`.
    #[must_use]
    pub fn decode(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Short machine-readable name of the error kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network { .. } => "network",
            Self::HttpStatus { .. } => "http_status",
            Self::Precondition(_) => "precondition",
            Self::Cancelled(_) => "cancelled",
            Self::InvalidRequest { .. } => "invalid_request",
            Self::Decode { .. } => "decode",
            Self::Config(_) => "config",
            Self::Serialization(_) => "serialization",
            Self::Io(_) => "io",
        }
    }

    /// Returns the HTTP status if this is a status error.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true if the error came from cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }

    /// Converts to a serializable report for observers.
    #[must_use]
    pub fn to_report(&self) -> ErrorReport {
        let mut report = ErrorReport::new(self.kind(), self.to_string());
        match self {
            Self::Network { url, .. } | Self::InvalidRequest { url, .. } | Self::Decode { url, .. } => {
                report = report.with_context_entry("url", url.clone());
            }
            Self::HttpStatus { status, url, body } => {
                report = report
                    .with_context_entry("url", url.clone())
                    .with_context_entry("status", status.to_string());
                if !body.is_empty() {
                    report = report.with_context_entry("body", body.clone());
                }
            }
            _ => {}
        }
        report
    }
}

/// Serializable description of an error, suitable for events and snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ErrorReport {
    /// Error kind (see [`ReportflowError::kind`]).
    pub kind: String,
    /// Human-readable message.
    pub message: String,
    /// Additional context key-value pairs.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, String>,
}

impl ErrorReport {
    /// Creates a new error report.
    #[must_use]
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            context: HashMap::new(),
        }
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}
