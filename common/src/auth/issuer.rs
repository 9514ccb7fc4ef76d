// common/src/auth/issuer.rs
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use super::clock::Clock;
use super::encoding::{padded_base64_encode, wrap_token};
use super::envelope::{derive_key, EnvelopeError, FernetKey};
use crate::config::AuthConfig;

/// JSON object sealed inside the envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InnerPayload {
    /// base64 of `<endpoint><unix seconds><constant words>`
    pub auth_token: String,
}

#[derive(Debug, Error)]
pub enum TokenIssuanceError {
    #[error("failed to serialize token payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("failed to seal token: {0}")]
    Envelope(#[from] EnvelopeError),
}

/// Builds bearer tokens bound to one endpoint path
#[derive(Clone)]
pub struct TokenIssuer {
    settings: Arc<AuthConfig>,
    clock: Arc<dyn Clock>,
}

impl TokenIssuer {
    pub fn new(settings: Arc<AuthConfig>, clock: Arc<dyn Clock>) -> Self {
        Self { settings, clock }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Issue a token for `endpoint` stamped with the current time.
    ///
    /// `None` selects the configured default referral code. An empty string is
    /// used as given.
    pub fn issue(&self, endpoint: &str, referral_code: Option<&str>) -> Result<String, TokenIssuanceError> {
        self.issue_at(endpoint, referral_code, self.clock.now_secs())
    }

    /// Issue a token as if the clock read `timestamp` (Unix seconds)
    pub fn issue_at(
        &self,
        endpoint: &str,
        referral_code: Option<&str>,
        timestamp: i64,
    ) -> Result<String, TokenIssuanceError> {
        let signed = format!("{}{}{}", endpoint, timestamp, self.settings.constant_words);
        let payload = InnerPayload {
            auth_token: padded_base64_encode(&signed),
        };
        let json = serde_json::to_vec(&payload)?;

        let referral_code = referral_code.unwrap_or(&self.settings.default_referral_code);
        let key = FernetKey::from(&derive_key(self.settings.shared_secret.expose(), referral_code));
        let sealed = key.encrypt(&json, timestamp)?;

        tracing::debug!(endpoint, timestamp, "Issued bearer token");
        Ok(wrap_token(&sealed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::ManualClock;
    use crate::auth::encoding::{padded_base64_decode, unwrap_token};

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(
            Arc::new(AuthConfig::with_secret("test-secret")),
            Arc::new(ManualClock::at_secs(1_700_000_000)),
        )
    }

    fn open(token: &str, referral_code: &str) -> InnerPayload {
        let sealed = unwrap_token(token).unwrap();
        let key = FernetKey::from(&derive_key(b"test-secret", referral_code));
        let payload = key.decrypt(&sealed, None, 0).unwrap();
        serde_json::from_value(payload.into_json()).unwrap()
    }

    #[test]
    fn test_inner_string_layout() {
        let token = issuer().issue("/api/balance/123", Some("LighterFarmSecureAPI")).unwrap();
        let inner = open(&token, "LighterFarmSecureAPI");

        assert_eq!(
            inner.auth_token,
            "L2FwaS9iYWxhbmNlLzEyMzE3MDAwMDAwMDBMaWdodGVyRmFybVNlY3VyZUFQSQ=="
        );
        assert_eq!(
            padded_base64_decode(&inner.auth_token).unwrap(),
            "/api/balance/1231700000000LighterFarmSecureAPI"
        );
    }

    #[test]
    fn test_default_referral_code_when_absent() {
        let token = issuer().issue("/api/points", None).unwrap();
        let inner = open(&token, "LighterFarmSecureAPI");
        assert_eq!(
            padded_base64_decode(&inner.auth_token).unwrap(),
            "/api/points1700000000LighterFarmSecureAPI"
        );
    }

    #[test]
    fn test_tokens_are_randomized() {
        let issuer = issuer();
        let first = issuer.issue_at("/api/points", None, 1_700_000_000).unwrap();
        let second = issuer.issue_at("/api/points", None, 1_700_000_000).unwrap();
        assert_ne!(first, second);
    }
}
