//! Request/reply packets exchanged with backend services over the transport.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Header carrying the caller's bearer credential inside an envelope.
pub const AUTHORIZATION_FIELD: &str = "authorization";

/// One routed request: `pattern` names the handler inside the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEnvelope {
    pub id: Uuid,
    pub pattern: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
}

impl MessageEnvelope {
    pub fn new(pattern: impl Into<String>, data: Value, headers: BTreeMap<String, String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            pattern: pattern.into(),
            data,
            headers,
            reply_to: None,
        }
    }

    /// The `authorization` header field, matched case-insensitively.
    pub fn authorization(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(AUTHORIZATION_FIELD))
            .map(|(_, v)| v.as_str())
    }
}

/// Reply correlated to a [`MessageEnvelope`] by `id`.
///
/// Exactly one of `response` / `err` is meaningful; a reply with neither is a
/// successful `null` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyPacket {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub err: Option<Value>,
}

impl ReplyPacket {
    pub fn response(id: Uuid, value: Value) -> Self {
        Self {
            id,
            response: Some(value),
            err: None,
        }
    }

    pub fn error(id: Uuid, err: Value) -> Self {
        Self {
            id,
            response: None,
            err: Some(err),
        }
    }

    pub fn into_result(self) -> Result<Value, Value> {
        match self.err {
            Some(err) => Err(err),
            None => Ok(self.response.unwrap_or(Value::Null)),
        }
    }
}
