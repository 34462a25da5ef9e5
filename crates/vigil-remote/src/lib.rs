//! # Vigil Remote
//!
//! A [`RemoteTransport`] over HTTP for remote validation rules.
//!
//! `GET` requests arrive with the payload already folded into the query
//! string; every other method sends the payload as a JSON body. Responses
//! are decoded as JSON, and an empty body reads as `null`.
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use vigil_core::Hooks;
//! use vigil_remote::HttpTransport;
//!
//! # fn main() -> Result<(), vigil_core::TransportError> {
//! let transport = HttpTransport::builder()
//!     .base_url("https://forms.example.com")
//!     .timeout(Duration::from_secs(5))
//!     .build()?;
//! let hooks = Hooks::new().transport(transport);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use http::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use http::Method;
use serde_json::Value;
use std::time::Duration;
use vigil_core::{RemoteTransport, TransportError};

/// HTTP transport backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Option<String>,
}

impl HttpTransport {
    /// Transport with a default client and no base URL.
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    /// Transport over an existing client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: None,
        }
    }

    pub fn builder() -> HttpTransportBuilder {
        HttpTransportBuilder::default()
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// Resolve a rule URL against the base URL. Absolute URLs are kept.
    pub fn resolve(&self, url: &str) -> String {
        match &self.base_url {
            Some(base) if !is_absolute(url) => {
                format!("{}/{}", base.trim_end_matches('/'), url.trim_start_matches('/'))
            }
            _ => url.to_string(),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn is_absolute(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

#[async_trait]
impl RemoteTransport for HttpTransport {
    async fn call(
        &self,
        url: &str,
        method: Method,
        payload: Option<Value>,
    ) -> Result<Value, TransportError> {
        let url = self.resolve(url);
        tracing::debug!(url = %url, method = %method, "sending validation request");

        let mut request = self.client.request(method, url.as_str());
        if let Some(payload) = payload {
            request = request.json(&payload);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(url = %url, status = status.as_u16(), "validation request rejected");
            return Err(TransportError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        decode(&body)
    }
}

fn decode(body: &str) -> Result<Value, TransportError> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(body).map_err(|e| TransportError::Body(e.to_string()))
}

/// Builder for [`HttpTransport`].
#[derive(Debug, Default)]
pub struct HttpTransportBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    headers: HeaderMap,
}

impl HttpTransportBuilder {
    /// Prefix for relative rule URLs.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Header sent with every request.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn build(mut self) -> Result<HttpTransport, TransportError> {
        self.headers
            .entry(ACCEPT)
            .or_insert(HeaderValue::from_static("application/json"));

        let mut client = reqwest::Client::builder().default_headers(self.headers);
        if let Some(timeout) = self.timeout {
            client = client.timeout(timeout);
        }
        let client = client
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;

        Ok(HttpTransport {
            client,
            base_url: self.base_url,
        })
    }
}
