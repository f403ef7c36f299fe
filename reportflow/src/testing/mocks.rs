//! Scripted transport for testing stage adapters and retries offline.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;

use crate::transport::{HttpRequest, HttpResponse, RequestBody, Transport, TransportError};

/// One scripted reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptedReply {
    /// A JSON body with a status.
    Json(u16, Value),
    /// A raw text body with a status.
    Text(u16, String),
    /// No response at all.
    Network(TransportError),
}

impl ScriptedReply {
    /// 200 with a JSON body.
    #[must_use]
    pub fn ok(value: Value) -> Self {
        Self::Json(200, value)
    }

    /// An empty body with the given status.
    #[must_use]
    pub fn status(status: u16) -> Self {
        Self::Text(status, String::new())
    }

    /// A raw text body.
    #[must_use]
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self::Text(status, body.into())
    }

    /// A connection failure.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(TransportError::Connect(message.into()))
    }

    fn into_result(self) -> Result<HttpResponse, TransportError> {
        match self {
            Self::Json(status, value) => Ok(HttpResponse::new(status, value.to_string())),
            Self::Text(status, body) => Ok(HttpResponse::new(status, body)),
            Self::Network(err) => Err(err),
        }
    }
}

/// A request observed by [`ScriptedTransport`].
#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// Target URL.
    pub url: String,
    /// Request body.
    pub body: RequestBody,
    /// When the request was issued (tokio clock, so paused tests are exact).
    pub at: tokio::time::Instant,
}

impl RecordedCall {
    /// The JSON body, if any.
    #[must_use]
    pub fn json(&self) -> Option<&Value> {
        match &self.body {
            RequestBody::Json(value) => Some(value),
            RequestBody::Multipart(_) => None,
        }
    }
}

/// A transport that answers from per-route scripts.
///
/// Routes match on URL suffix. Replies are consumed in order; the last reply
/// of a route repeats forever. Unscripted URLs answer 404.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    routes: Mutex<Vec<(String, VecDeque<ScriptedReply>)>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedTransport {
    /// Creates a transport with no routes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a route, replacing any route with the same suffix.
    #[must_use]
    pub fn on(self, suffix: impl Into<String>, replies: impl IntoIterator<Item = ScriptedReply>) -> Self {
        let suffix = suffix.into();
        let replies: VecDeque<ScriptedReply> = replies.into_iter().collect();
        {
            let mut routes = self.routes.lock();
            match routes.iter_mut().find(|(existing, _)| *existing == suffix) {
                Some(route) => route.1 = replies,
                None => routes.push((suffix, replies)),
            }
        }
        self
    }

    /// Returns all recorded calls.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Returns the calls whose URL ends with `suffix`.
    #[must_use]
    pub fn calls_to(&self, suffix: &str) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.url.ends_with(suffix))
            .cloned()
            .collect()
    }

    /// Number of requests issued.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    fn next_reply(&self, url: &str) -> ScriptedReply {
        let mut routes = self.routes.lock();
        let Some((_, replies)) = routes.iter_mut().find(|(suffix, _)| url.ends_with(suffix.as_str())) else {
            return ScriptedReply::text(404, "no scripted reply");
        };
        if replies.len() > 1 {
            replies.pop_front().unwrap_or_else(|| ScriptedReply::status(404))
        } else {
            replies.front().cloned().unwrap_or_else(|| ScriptedReply::status(404))
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.calls.lock().push(RecordedCall {
            url: request.url.clone(),
            body: request.body.clone(),
            at: tokio::time::Instant::now(),
        });
        self.next_reply(&request.url).into_result()
    }
}
