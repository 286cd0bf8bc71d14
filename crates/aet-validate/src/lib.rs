//! Rejects malformed or inconsistent intake files before any side effect.
//!
//! Stateless: every function here is a pure function of its inputs, apart
//! from [`validate_order_file`] reading the file it is given.

mod body;
mod error;
mod filename;

pub use body::{is_crypto_symbol, validate_body, ValidatedOrder, MAX_ORDER_QUERY_LIMIT};
pub use error::{FilenameError, ValidationError};
pub use filename::{
    is_agent_id, parse_timestamp, salvage_filename, validate_filename, FilenameFields,
    SalvagedFields, SENTINEL_TIMESTAMP, UNKNOWN,
};

use std::path::Path;

/// Filename, then read, then parse, then body.
pub fn validate_order_file(path: &Path) -> Result<ValidatedOrder, ValidationError> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or(FilenameError::NotUtf8)?;
    let fields = validate_filename(name)?;

    let raw = std::fs::read_to_string(path).map_err(|e| ValidationError::Read(e.to_string()))?;
    let body: serde_json::Value =
        serde_json::from_str(&raw).map_err(|e| ValidationError::Json(e.to_string()))?;

    validate_body(&body, &fields)
}
