// common/src/auth/error.rs
use thiserror::Error;

/// Why an inbound bearer token was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("no bearer token supplied")]
    MissingToken,

    #[error("bearer token is empty")]
    EmptyToken,

    #[error("token envelope could not be opened")]
    MalformedEnvelope,

    #[error("token payload has no auth_token")]
    InvalidTokenFormat,

    #[error("token signature suffix not found")]
    InvalidSignature,

    #[error("token timestamp is not ten digits")]
    InvalidTimestamp,

    #[error("token outside the validity window")]
    TokenExpired,
}

/// Response class a transport should use for a rejection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// No usable credential: 401
    Unauthorized,
    /// Credential present but unacceptable: 403
    Forbidden,
}

impl AuthError {
    pub fn status_class(&self) -> StatusClass {
        match self {
            AuthError::MissingToken | AuthError::EmptyToken | AuthError::TokenExpired => {
                StatusClass::Unauthorized
            }
            AuthError::MalformedEnvelope
            | AuthError::InvalidTokenFormat
            | AuthError::InvalidSignature
            | AuthError::InvalidTimestamp => StatusClass::Forbidden,
        }
    }

    /// Stable machine-readable kind, safe to log
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "missing_token",
            AuthError::EmptyToken => "empty_token",
            AuthError::MalformedEnvelope => "malformed_envelope",
            AuthError::InvalidTokenFormat => "invalid_token_format",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::InvalidTimestamp => "invalid_timestamp",
            AuthError::TokenExpired => "token_expired",
        }
    }

    /// Message for API callers. Every malformed token reads the same so a
    /// caller cannot tell which check failed.
    pub fn public_message(&self) -> &'static str {
        match self {
            AuthError::MissingToken | AuthError::EmptyToken => "Authorization token required",
            AuthError::TokenExpired => "Authorization token expired",
            _ => "Invalid authorization token",
        }
    }
}
