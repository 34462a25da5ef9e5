//! Server-side validation responses.
//!
//! A server may validate a submitted model itself and answer either with a
//! flat `path → result` map or with an envelope `{ success, messages }`.
//! Applying a response to a node overwrites the local state of every field
//! the response mentions with a non-success entry and resets all other
//! fields to success, so applying the same response twice is a no-op.

use crate::result::FieldResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Validation messages returned by a server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerResponse {
    Envelope {
        success: bool,
        #[serde(default)]
        messages: HashMap<String, FieldResult>,
    },
    Fields(HashMap<String, FieldResult>),
}

impl ServerResponse {
    pub fn messages(&self) -> &HashMap<String, FieldResult> {
        match self {
            ServerResponse::Envelope { messages, .. } => messages,
            ServerResponse::Fields(messages) => messages,
        }
    }

    /// The non-success entry for a field path, if any.
    pub fn message(&self, path: &str) -> Option<&FieldResult> {
        self.messages().get(path).filter(|m| !m.is_success())
    }

    /// Whether the server considers the whole model valid.
    pub fn is_success(&self) -> bool {
        match self {
            ServerResponse::Envelope { success, .. } => *success,
            ServerResponse::Fields(messages) => messages.values().all(FieldResult::is_success),
        }
    }
}

impl From<HashMap<String, FieldResult>> for ServerResponse {
    fn from(messages: HashMap<String, FieldResult>) -> Self {
        ServerResponse::Fields(messages)
    }
}
