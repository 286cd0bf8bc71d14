//! Broker credential resolution.
//!
//! Config stores env var NAMES. Values are read here, once per mode, and
//! handed to the adapter. `Debug` never prints a value and errors name the
//! variable only.

use crate::BrokerEndpoint;
use thiserror::Error;

#[derive(Clone)]
pub struct BrokerCredentials {
    pub api_key: String,
    pub api_secret: String,
}

impl std::fmt::Debug for BrokerCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerCredentials")
            .field("api_key", &"<REDACTED>")
            .field("api_secret", &"<REDACTED>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("SECRETS_MISSING: required env var '{var}' is not set or empty")]
pub struct MissingSecret {
    pub var: String,
}

/// Returns `None` if the variable is unset or blank.
fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// Both halves are required; the key id is checked first.
pub fn resolve_broker_credentials(endpoint: &BrokerEndpoint) -> Result<BrokerCredentials, MissingSecret> {
    let missing = |var: &str| MissingSecret { var: var.to_string() };

    let api_key = resolve_env(&endpoint.keys_env.api_key).ok_or_else(|| missing(&endpoint.keys_env.api_key))?;
    let api_secret =
        resolve_env(&endpoint.keys_env.api_secret).ok_or_else(|| missing(&endpoint.keys_env.api_secret))?;

    Ok(BrokerCredentials { api_key, api_secret })
}
