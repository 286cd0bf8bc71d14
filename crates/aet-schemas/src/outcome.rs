use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Success,
    Error,
}

/// `error.type` values a producer may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ValidationError,
    DuplicateError,
    ClientInitError,
    ApiError,
    UnknownError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ValidationError => "validation_error",
            ErrorKind::DuplicateError => "duplicate_error",
            ErrorKind::ClientInitError => "client_init_error",
            ErrorKind::ApiError => "api_error",
            ErrorKind::UnknownError => "unknown_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeError {
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub message: String,
    /// Always an object; `{}` when there is nothing to add.
    pub details: Value,
}

/// One processing attempt, as seen by the producer. Written once, never
/// rewritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub request_order_id: Option<String>,
    pub agent_id: String,
    pub client_order_id: String,
    pub timestamp: DateTime<Utc>,
    pub status: OutcomeStatus,
    pub data: Option<Value>,
    pub error: Option<OutcomeError>,
}

impl OutcomeRecord {
    pub fn success(
        agent_id: &str,
        client_order_id: &str,
        request_order_id: Option<String>,
        data: Value,
    ) -> Self {
        Self {
            request_order_id,
            agent_id: agent_id.to_string(),
            client_order_id: client_order_id.to_string(),
            timestamp: Utc::now(),
            status: OutcomeStatus::Success,
            data: Some(data),
            error: None,
        }
    }

    /// `request_order_id` is set when the broker already assigned an id
    /// before the failure (a post-dispatch failure).
    pub fn error(
        agent_id: &str,
        client_order_id: &str,
        request_order_id: Option<String>,
        kind: ErrorKind,
        message: impl Into<String>,
        details: Option<Value>,
    ) -> Self {
        let details = match details {
            Some(v @ Value::Object(_)) => v,
            Some(other) => serde_json::json!({ "detail": other }),
            None => Value::Object(Default::default()),
        };
        Self {
            request_order_id,
            agent_id: agent_id.to_string(),
            client_order_id: client_order_id.to_string(),
            timestamp: Utc::now(),
            status: OutcomeStatus::Error,
            data: None,
            error: Some(OutcomeError {
                kind,
                message: message.into(),
                details,
            }),
        }
    }
}
