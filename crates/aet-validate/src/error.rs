use aet_schemas::OrderType;
use thiserror::Error;

/// Why an intake filename was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilenameError {
    #[error("Filename must end with .json")]
    MissingExtension,

    #[error("Filename is not valid UTF-8")]
    NotUtf8,

    #[error("Filename must have exactly 4 parts separated by underscores, got {0}")]
    PartCount(usize),

    #[error("Invalid mode '{0}'. Must be 'paper' or 'live' (lowercase)")]
    Mode(String),

    #[error("Invalid agent_id '{0}'. Must be 1-20 lowercase alphanumeric characters")]
    AgentId(String),

    #[error("Invalid order_type '{0}'. Must be one of: {allowed}", allowed = OrderType::allowed_list())]
    OrderType(String),

    #[error("Invalid timestamp '{0}'. Must be exactly 20 digits (YYYYMMDDHHMMSSffffff)")]
    TimestampDigits(String),

    /// Twenty digits that do not name a real instant (month 13, Feb 30, ...).
    #[error("Invalid timestamp format '{value}': {reason}")]
    TimestampCalendar { value: String, reason: &'static str },
}

/// Everything that can reject an intake file before any side effect.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error(transparent)]
    Filename(#[from] FilenameError),

    #[error("Failed to read file: {0}")]
    Read(String),

    #[error("Invalid JSON: {0}")]
    Json(String),

    #[error("Invalid JSON structure: {0}")]
    Structure(String),

    #[error("Mode mismatch: filename has '{filename}', JSON has '{body}'")]
    ModeMismatch { filename: String, body: String },

    #[error("Agent ID mismatch: filename has '{filename}', JSON has '{body}'")]
    AgentMismatch { filename: String, body: String },

    #[error("Order type mismatch: filename has '{filename}', JSON has '{body}'")]
    OrderTypeMismatch { filename: String, body: String },

    #[error("Invalid payload for {order_type}: {reason}")]
    Payload { order_type: OrderType, reason: String },
}

impl ValidationError {
    /// Short stage label recorded in outcome details.
    pub fn stage(&self) -> &'static str {
        match self {
            ValidationError::Filename(_) => "filename",
            ValidationError::Read(_) => "read",
            ValidationError::Json(_) => "json",
            ValidationError::Structure(_) => "structure",
            ValidationError::ModeMismatch { .. }
            | ValidationError::AgentMismatch { .. }
            | ValidationError::OrderTypeMismatch { .. } => "cross_check",
            ValidationError::Payload { .. } => "payload",
        }
    }
}
