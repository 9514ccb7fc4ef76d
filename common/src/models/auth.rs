// common/src/models/auth.rs
use serde::{Deserialize, Serialize};

use crate::auth::{AuthError, VerifiedToken};

/// Body of every rejected request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    pub message: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            message: message.into(),
        }
    }
}

impl From<&AuthError> for ErrorBody {
    fn from(err: &AuthError) -> Self {
        let error = match err.status_class() {
            crate::auth::StatusClass::Unauthorized => "Unauthorized",
            crate::auth::StatusClass::Forbidden => "Forbidden",
        };
        Self::new(error, err.public_message())
    }
}

/// Request for a server-issued token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRequest {
    pub endpoint: String,
    #[serde(default)]
    pub referral_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub success: bool,
    pub token: String,
}

/// Response for authenticated probes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthCheckResponse {
    pub success: bool,
    pub auth: VerifiedToken,
}

/// Response for routes that serve anonymous callers too
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallerStatusResponse {
    pub success: bool,
    pub authenticated: bool,
    pub auth: Option<VerifiedToken>,
}

impl From<Option<VerifiedToken>> for CallerStatusResponse {
    fn from(auth: Option<VerifiedToken>) -> Self {
        Self {
            success: true,
            authenticated: auth.is_some(),
            auth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_body_never_names_the_failed_check() {
        let body = ErrorBody::from(&AuthError::MalformedEnvelope);
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "success": false,
                "error": "Forbidden",
                "message": "Invalid authorization token"
            })
        );
        assert_eq!(ErrorBody::from(&AuthError::InvalidSignature), body);

        let expired = ErrorBody::from(&AuthError::TokenExpired);
        assert_eq!(expired.error, "Unauthorized");
    }

    #[test]
    fn test_token_request_referral_is_optional() {
        let request: TokenRequest = serde_json::from_value(json!({ "endpoint": "/api/points" })).unwrap();
        assert_eq!(request.endpoint, "/api/points");
        assert!(request.referral_code.is_none());
    }
}
