//! Brokerage boundary.
//!
//! The pipeline sees the broker only through [`Dispatcher`]: one validated
//! payload plus its idempotency key in, a normalised result or a classified
//! error out. Which HTTP call a payload becomes is the adapter's business.

use aet_schemas::{Mode, OrderPayload};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

/// What the broker said, reduced to the fields producers rely on.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchResult {
    /// Broker-assigned order id, when the call created or addressed one.
    pub upstream_id: Option<String>,
    /// Order fields for placements, a type-specific shape for queries.
    pub data: Value,
}

impl DispatchResult {
    pub fn new(data: Value) -> Self {
        let upstream_id = data
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string);
        Self { upstream_id, data }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    /// Credentials were refused. Retrying will not help.
    #[error("broker authentication failed (HTTP {status}): {message}")]
    Auth { status: u16, message: String },

    /// The broker understood the request and said no.
    #[error("broker rejected request (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    /// Network failure or a 5xx. The order may be resubmitted under a new key.
    #[error("transient broker failure: {0}")]
    Transient(String),

    #[error("broker call timed out after {0:?}")]
    Timeout(Duration),

    #[error("unreadable broker response: {0}")]
    Decode(String),
}

impl DispatchError {
    pub fn class(&self) -> &'static str {
        match self {
            DispatchError::Auth { .. } => "auth",
            DispatchError::Rejected { .. } => "rejected",
            DispatchError::Transient(_) => "transient",
            DispatchError::Timeout(_) => "timeout",
            DispatchError::Decode(_) => "decode",
        }
    }

    /// Outcome `error.details` for this failure.
    pub fn details(&self) -> Value {
        match self {
            DispatchError::Auth { status, .. } | DispatchError::Rejected { status, .. } => {
                json!({ "class": self.class(), "http_status": status })
            }
            DispatchError::Timeout(d) => json!({ "class": self.class(), "timeout_ms": d.as_millis() as u64 }),
            DispatchError::Transient(_) | DispatchError::Decode(_) => json!({ "class": self.class() }),
        }
    }
}

/// A dispatcher for a mode could not be built.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClientInitError {
    /// Names the variable, never its value.
    #[error("missing credential for {mode} mode: env var '{var}' is not set or empty")]
    MissingCredential { mode: Mode, var: String },

    #[error("{0}")]
    Build(String),
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

#[async_trait::async_trait]
pub trait Dispatcher: Send + Sync {
    /// Send one order or query to the broker.
    ///
    /// `client_order_id` is forwarded on placements so the broker can reject
    /// a replay on its side too.
    async fn submit(
        &self,
        payload: &OrderPayload,
        client_order_id: &str,
    ) -> Result<DispatchResult, DispatchError>;
}

/// Builds one dispatcher per mode. Called lazily, at most once per mode on
/// success.
pub trait DispatcherFactory: Send + Sync {
    fn connect(&self, mode: Mode) -> Result<Arc<dyn Dispatcher>, ClientInitError>;
}
