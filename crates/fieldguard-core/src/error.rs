//! Shared error type across fieldguard crates.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Invalid input / malformed configuration.
    BadRequest,
    /// Policy source could not be loaded.
    PolicyInvalid,
    /// Unsupported config version.
    UnsupportedVersion,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::PolicyInvalid => "POLICY_INVALID",
            ClientCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, FilterError>;

/// Unified error type used by core and gateway.
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("policy io: {0}")]
    PolicyIo(String),
    #[error("policy line {line}: {reason}")]
    PolicyFormat { line: usize, reason: String },
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("transform `{name}` failed: {reason}")]
    Transform { name: String, reason: String },
    #[error("serialize: {0}")]
    Serialize(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl FilterError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            FilterError::PolicyIo(_) | FilterError::PolicyFormat { .. } => ClientCode::PolicyInvalid,
            FilterError::BadRequest(_) => ClientCode::BadRequest,
            FilterError::UnsupportedVersion => ClientCode::UnsupportedVersion,
            FilterError::Transform { .. }
            | FilterError::Serialize(_)
            | FilterError::Internal(_) => ClientCode::Internal,
        }
    }
}
