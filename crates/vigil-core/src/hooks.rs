//! External collaborators used by a validation session.
//!
//! The session never performs I/O itself. Remote checks go through a
//! [`RemoteTransport`], raw responses are post-processed by a
//! [`ResultHandler`], date comparisons use a [`DateParser`], and hosts that
//! need change notification (for example to drive a UI) plug in a
//! [`NodeObserver`].

use crate::error::{RuleError, TransportError};
use crate::model::Model;
use crate::node::NodeState;
use crate::rules::RemoteCheck;
use crate::session::ValidationSession;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use http::Method;
use serde_json::Value;
use std::sync::Arc;

/// Transport for remote checks.
///
/// `GET` requests carry the payload as a query string (see [`append_query`]),
/// every other method sends it as a JSON body.
#[async_trait]
pub trait RemoteTransport: Send + Sync {
    async fn call(
        &self,
        url: &str,
        method: Method,
        payload: Option<Value>,
    ) -> Result<Value, TransportError>;
}

/// Post-processes a raw remote response into the shape a rule expects.
///
/// `rule` is the remote check that issued the call, so handlers can branch
/// on its URL or method.
#[async_trait]
pub trait ResultHandler: Send + Sync {
    async fn handle(
        &self,
        session: &ValidationSession,
        model: &Model,
        field: &str,
        rule: &RemoteCheck,
        response: Value,
    ) -> Result<Value, RuleError>;
}

/// Returns responses unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

#[async_trait]
impl ResultHandler for PassThrough {
    async fn handle(
        &self,
        _session: &ValidationSession,
        _model: &Model,
        _field: &str,
        _rule: &RemoteCheck,
        response: Value,
    ) -> Result<Value, RuleError> {
        Ok(response)
    }
}

/// Converts a date string into a comparable timestamp in milliseconds.
pub trait DateParser: Send + Sync {
    fn value_of(&self, date: &str, locale: &str, format: &str) -> Option<i64>;
}

/// Date parser based on `chrono`.
///
/// With a format, the date is parsed with that `strftime` format (date-time
/// first, then date only). Without one, RFC 3339, `%Y-%m-%dT%H:%M:%S` and
/// `%Y-%m-%d` are tried in turn. Naive values are read as UTC and the locale
/// is not consulted.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChronoDateParser;

impl DateParser for ChronoDateParser {
    fn value_of(&self, date: &str, _locale: &str, format: &str) -> Option<i64> {
        let date = date.trim();
        if !format.is_empty() {
            return parse_naive(date, format);
        }

        if let Ok(parsed) = DateTime::parse_from_rfc3339(date) {
            return Some(parsed.timestamp_millis());
        }

        parse_naive(date, "%Y-%m-%dT%H:%M:%S").or_else(|| parse_naive(date, "%Y-%m-%d"))
    }
}

fn parse_naive(date: &str, format: &str) -> Option<i64> {
    if let Ok(parsed) = NaiveDateTime::parse_from_str(date, format) {
        return Some(parsed.and_utc().timestamp_millis());
    }

    NaiveDate::parse_from_str(date, format)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
}

/// Receives node state changes.
pub trait NodeObserver: Send + Sync {
    fn state_changed(&self, path: &str, state: &NodeState);
}

/// The collaborator set of a session.
#[derive(Clone)]
pub struct Hooks {
    transport: Option<Arc<dyn RemoteTransport>>,
    result_handler: Arc<dyn ResultHandler>,
    date_parser: Arc<dyn DateParser>,
    observer: Option<Arc<dyn NodeObserver>>,
}

impl Default for Hooks {
    fn default() -> Self {
        Self {
            transport: None,
            result_handler: Arc::new(PassThrough),
            date_parser: Arc::new(ChronoDateParser),
            observer: None,
        }
    }
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the remote transport.
    pub fn transport(mut self, transport: impl RemoteTransport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Set the remote transport from an Arc.
    pub fn transport_arc(mut self, transport: Arc<dyn RemoteTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn result_handler(mut self, handler: impl ResultHandler + 'static) -> Self {
        self.result_handler = Arc::new(handler);
        self
    }

    pub fn date_parser(mut self, parser: impl DateParser + 'static) -> Self {
        self.date_parser = Arc::new(parser);
        self
    }

    pub fn observer(mut self, observer: impl NodeObserver + 'static) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    /// Set the observer from an Arc, keeping a handle for the caller.
    pub fn observer_arc(mut self, observer: Arc<dyn NodeObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn has_transport(&self) -> bool {
        self.transport.is_some()
    }

    pub(crate) fn get_transport(&self) -> Option<&Arc<dyn RemoteTransport>> {
        self.transport.as_ref()
    }

    pub(crate) fn get_result_handler(&self) -> &Arc<dyn ResultHandler> {
        &self.result_handler
    }

    pub(crate) fn get_date_parser(&self) -> &Arc<dyn DateParser> {
        &self.date_parser
    }

    pub(crate) fn get_observer(&self) -> Option<&Arc<dyn NodeObserver>> {
        self.observer.as_ref()
    }
}

impl std::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks")
            .field("has_transport", &self.transport.is_some())
            .field("has_observer", &self.observer.is_some())
            .finish()
    }
}

/// Append an object payload to a URL as a query string.
///
/// String members are used verbatim, other members by their JSON text.
/// Non-object payloads leave the URL unchanged.
pub fn append_query(url: &str, payload: &Value) -> String {
    let Value::Object(map) = payload else {
        return url.to_string();
    };
    if map.is_empty() {
        return url.to_string();
    }

    let pairs: Vec<(&str, String)> = map
        .iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.as_str(), value)
        })
        .collect();
    let query = serde_urlencoded::to_string(&pairs).unwrap_or_default();
    let separator = if url.contains('?') { '&' } else { '?' };

    format!("{url}{separator}{query}")
}
