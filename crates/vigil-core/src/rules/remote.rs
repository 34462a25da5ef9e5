use super::{Check, RuleOutput};
use crate::error::RuleError;
use crate::model::Model;
use crate::path;
use crate::result::FieldResult;
use crate::session::ValidationSession;
use async_trait::async_trait;
use http::Method;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

type PayloadFn = Arc<dyn Fn(&Model) -> Value + Send + Sync>;
type ResponseMapper = Arc<dyn Fn(Value) -> Result<RuleOutput, RuleError> + Send + Sync>;

/// A validator that asks a server.
///
/// The payload is sent through the session's `call_server` hook, the raw
/// response goes through `handle_result`, and the mapped response decides
/// the outcome. By default the payload is `{ <field>: <value> }` and the
/// response is read with [`error_message`].
#[derive(Clone)]
pub struct RemoteCheck {
    url: String,
    method: Method,
    field: String,
    payload: PayloadFn,
    mapper: ResponseMapper,
}

impl RemoteCheck {
    pub fn new(method: Method, url: impl Into<String>, field: impl Into<String>) -> Self {
        let field = field.into();
        let payload_field = field.clone();
        Self {
            url: url.into(),
            method,
            payload: Arc::new(move |model| {
                let (_, key) = path::split_last(&payload_field);
                let mut payload = Map::new();
                payload.insert(
                    key.to_string(),
                    model.get(&payload_field).unwrap_or(Value::Null),
                );
                Value::Object(payload)
            }),
            mapper: Arc::new(error_message),
            field,
        }
    }

    pub fn get(url: impl Into<String>, field: impl Into<String>) -> Self {
        Self::new(Method::GET, url, field)
    }

    pub fn post(url: impl Into<String>, field: impl Into<String>) -> Self {
        Self::new(Method::POST, url, field)
    }

    /// Replace the payload builder.
    pub fn payload(mut self, f: impl Fn(&Model) -> Value + Send + Sync + 'static) -> Self {
        self.payload = Arc::new(f);
        self
    }

    /// Replace the response mapping.
    pub fn map_response(
        mut self,
        f: impl Fn(Value) -> Result<RuleOutput, RuleError> + Send + Sync + 'static,
    ) -> Self {
        self.mapper = Arc::new(f);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path of the field the check validates.
    pub fn field(&self) -> &str {
        &self.field
    }
}

impl fmt::Debug for RemoteCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteCheck")
            .field("url", &self.url)
            .field("method", &self.method)
            .field("field", &self.field)
            .finish()
    }
}

#[async_trait]
impl Check<RuleOutput> for RemoteCheck {
    async fn check(&self, model: &Model, session: &ValidationSession) -> Result<RuleOutput, RuleError> {
        let payload = (self.payload)(model);
        tracing::debug!(url = %self.url, method = %self.method, field = %self.field, "remote check");

        let response = session
            .call_server(&self.url, self.method.clone(), Some(payload))
            .await?;
        let response = session.handle_result(model, &self.field, self, response).await?;

        (self.mapper)(response)
    }
}

/// Default response mapping.
///
/// `null` passes, a string is an error message, an object is read for its
/// `errorMessage` member or, when it carries a `status`, as a full field
/// result.
pub fn error_message(response: Value) -> Result<RuleOutput, RuleError> {
    match response {
        Value::Null => Ok(RuleOutput::Pass),
        Value::String(text) => Ok(RuleOutput::Message(text)),
        Value::Object(map) => match map.get("errorMessage").cloned() {
            Some(Value::String(text)) => Ok(RuleOutput::Message(text)),
            Some(Value::Null) | None if map.contains_key("status") => {
                let result: FieldResult = serde_json::from_value(Value::Object(map))?;
                Ok(RuleOutput::Result(result))
            }
            Some(Value::Null) | None => Ok(RuleOutput::Pass),
            Some(other) => Err(RuleError::new(format!("errorMessage must be a string, got {other}"))),
        },
        other => Err(RuleError::new(format!("unexpected remote response: {other}"))),
    }
}
