//! Test doubles for hooks.

use crate::error::TransportError;
use crate::hooks::{append_query, NodeObserver, RemoteTransport};
use crate::node::NodeState;
use crate::sync::lock;
use async_trait::async_trait;
use http::Method;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// A request seen by [`MockTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// Full URL, including the query string for `GET`
    pub url: String,
    pub method: Method,
    pub payload: Option<Value>,
}

enum Reply {
    Value(Value),
    Status(u16, String),
}

/// In-memory transport with canned replies keyed by URL (without query).
///
/// The reply is chosen when the call arrives, before any delay. Unknown URLs
/// answer `null`.
#[derive(Default)]
pub struct MockTransport {
    replies: Mutex<HashMap<String, Reply>>,
    calls: Mutex<Vec<RecordedCall>>,
    delays: Mutex<Vec<Duration>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, url: impl Into<String>, response: Value) -> Self {
        lock(&self.replies).insert(url.into(), Reply::Value(response));
        self
    }

    pub fn fail(self, url: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        lock(&self.replies).insert(url.into(), Reply::Status(status, message.into()));
        self
    }

    /// Delay the next calls, one entry per call, in order.
    pub fn delays(self, delays: impl IntoIterator<Item = Duration>) -> Self {
        lock(&self.delays).extend(delays);
        self
    }

    /// Change the reply of a URL after construction.
    pub fn set_reply(&self, url: impl Into<String>, response: Value) {
        lock(&self.replies).insert(url.into(), Reply::Value(response));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }
}

#[async_trait]
impl RemoteTransport for MockTransport {
    async fn call(
        &self,
        url: &str,
        method: Method,
        payload: Option<Value>,
    ) -> Result<Value, TransportError> {
        let full_url = match (&method, &payload) {
            (&Method::GET, Some(payload)) => append_query(url, payload),
            _ => url.to_string(),
        };
        lock(&self.calls).push(RecordedCall {
            url: full_url,
            method,
            payload,
        });

        let key = url.split('?').next().unwrap_or(url);
        let reply = match lock(&self.replies).get(key) {
            Some(Reply::Value(value)) => Ok(value.clone()),
            Some(Reply::Status(status, message)) => Err(TransportError::Status {
                status: *status,
                message: message.clone(),
            }),
            None => Ok(Value::Null),
        };

        let delay = {
            let mut delays = lock(&self.delays);
            (!delays.is_empty()).then(|| delays.remove(0))
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        reply
    }
}

/// Observer that records every state change.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<(String, NodeState)>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(String, NodeState)> {
        lock(&self.events).clone()
    }

    /// The last state reported for a path.
    pub fn last(&self, path: &str) -> Option<NodeState> {
        lock(&self.events)
            .iter()
            .rev()
            .find(|(p, _)| p == path)
            .map(|(_, state)| state.clone())
    }
}

impl NodeObserver for RecordingObserver {
    fn state_changed(&self, path: &str, state: &NodeState) {
        lock(&self.events).push((path.to_string(), state.clone()));
    }
}
