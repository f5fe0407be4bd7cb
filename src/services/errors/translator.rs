//! Maps heterogeneous failure shapes onto [`ErrorEnvelope`].

use axum::http::StatusCode;
use serde_json::Value;
use tracing::debug;

use super::envelope::ErrorEnvelope;

/// Message used for anything the keyword table does not recognize.
pub const GENERIC_MESSAGE: &str = "Internal server error";

/// A failure before translation.
#[derive(Debug, Clone, PartialEq)]
pub enum RawFailure {
    /// The producer already declared the external status.
    Structured {
        status_code: u16,
        message: String,
        error: Option<String>,
        details: Option<Value>,
    },
    /// Free text: a plain string error or an opaque exception rendering.
    Message(String),
}

impl RawFailure {
    /// Interpret whatever a backend put in a reply's `err` field.
    ///
    /// Objects with a numeric `statusCode` (or `status`) are structured; a
    /// `message` array is joined. Everything else is treated as text.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::String(s) => Self::Message(s),
            Value::Object(ref map) => {
                let status = map
                    .get("statusCode")
                    .or_else(|| map.get("status"))
                    .and_then(Value::as_u64)
                    .and_then(|s| u16::try_from(s).ok());
                let message = map.get("message").and_then(message_text);

                match (status, message) {
                    (Some(status_code), message) => Self::Structured {
                        status_code,
                        message: message.unwrap_or_default(),
                        error: map.get("error").and_then(Value::as_str).map(str::to_string),
                        details: map.get("details").filter(|d| !d.is_null()).cloned(),
                    },
                    (None, Some(message)) => Self::Message(message),
                    (None, None) => Self::Message(value.to_string()),
                }
            }
            other => Self::Message(other.to_string()),
        }
    }
}

fn message_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => Some(
            items
                .iter()
                .map(|i| i.as_str().map(str::to_string).unwrap_or_else(|| i.to_string()))
                .collect::<Vec<_>>()
                .join(", "),
        ),
        _ => None,
    }
}

impl From<&str> for RawFailure {
    fn from(s: &str) -> Self {
        Self::Message(s.to_string())
    }
}

/// Keywords (any of, case-insensitive substring) mapped to one status.
#[derive(Debug, Clone)]
pub struct ErrorRule {
    pub keywords: Vec<String>,
    pub status: StatusCode,
}

impl ErrorRule {
    pub fn new<I, K>(keywords: I, status: StatusCode) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.into().to_ascii_lowercase())
                .collect(),
            status,
        }
    }

    fn matches(&self, lowered: &str) -> bool {
        self.keywords.iter().any(|k| lowered.contains(k.as_str()))
    }
}

/// Ordered keyword registry; first matching rule wins.
#[derive(Debug, Clone)]
pub struct ErrorTranslator {
    rules: Vec<ErrorRule>,
}

impl Default for ErrorTranslator {
    fn default() -> Self {
        Self::empty()
            .with_rule(ErrorRule::new(["not found"], StatusCode::NOT_FOUND))
            .with_rule(ErrorRule::new(["unauthorized"], StatusCode::UNAUTHORIZED))
            .with_rule(ErrorRule::new(["forbidden"], StatusCode::FORBIDDEN))
            .with_rule(ErrorRule::new(["conflict", "already exists"], StatusCode::CONFLICT))
            .with_rule(ErrorRule::new(["timeout", "timed out"], StatusCode::REQUEST_TIMEOUT))
            .with_rule(ErrorRule::new(
                ["unreachable", "empty response"],
                StatusCode::SERVICE_UNAVAILABLE,
            ))
            .with_rule(ErrorRule::new(["bad request"], StatusCode::BAD_REQUEST))
    }
}

impl ErrorTranslator {
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn with_rule(mut self, rule: ErrorRule) -> Self {
        self.push_rule(rule);
        self
    }

    /// Append a rule after the existing ones.
    pub fn push_rule(&mut self, rule: ErrorRule) {
        self.rules.push(rule);
    }

    pub fn classify(&self, message: &str) -> Option<StatusCode> {
        let lowered = message.to_ascii_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.matches(&lowered))
            .map(|rule| rule.status)
    }

    pub fn translate(&self, failure: RawFailure) -> ErrorEnvelope {
        match failure {
            RawFailure::Structured {
                status_code,
                message,
                error,
                details,
            } => {
                // A declared status that is not an error status can't be
                // forwarded as one.
                let Some(status) = StatusCode::from_u16(status_code)
                    .ok()
                    .filter(|s| s.is_client_error() || s.is_server_error())
                else {
                    debug!(status_code, "structured failure with non-error status");
                    return generic();
                };

                let mut envelope = ErrorEnvelope::new(status, message);
                if let Some(error) = error {
                    envelope = envelope.with_error(error);
                }
                if let Some(details) = details {
                    envelope = envelope.with_details(details);
                }
                envelope
            }
            RawFailure::Message(message) => match self.classify(&message) {
                Some(status) => ErrorEnvelope::new(status, message),
                None => generic(),
            },
        }
    }
}

fn generic() -> ErrorEnvelope {
    ErrorEnvelope::new(StatusCode::INTERNAL_SERVER_ERROR, GENERIC_MESSAGE)
}
