// common/src/auth/verifier.rs
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::clock::Clock;
use super::encoding::{padded_base64_decode, unwrap_token};
use super::envelope::{derive_key, FernetKey};
use super::error::AuthError;
use crate::config::AuthConfig;

pub const BEARER_PREFIX: &str = "Bearer ";

// Unix seconds stay ten digits wide until 2286
const TIMESTAMP_DIGITS: usize = 10;

/// Accepted token, attached to the request for downstream handlers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedToken {
    pub endpoint: String,
    pub timestamp: i64,
    pub verified: bool,
}

/// Classifies inbound `Authorization` header values
#[derive(Clone)]
pub struct TokenVerifier {
    settings: Arc<AuthConfig>,
    clock: Arc<dyn Clock>,
}

impl TokenVerifier {
    pub fn new(settings: Arc<AuthConfig>, clock: Arc<dyn Clock>) -> Self {
        Self { settings, clock }
    }

    /// Verify against the configured default referral code
    pub fn verify(&self, header: Option<&str>) -> Result<VerifiedToken, AuthError> {
        self.verify_with_referral(header, &self.settings.default_referral_code)
    }

    /// Verify with the key derived from a caller-declared referral code
    pub fn verify_with_referral(
        &self,
        header: Option<&str>,
        referral_code: &str,
    ) -> Result<VerifiedToken, AuthError> {
        let token = extract_bearer(header)?;

        let sealed = unwrap_token(token).map_err(|_| AuthError::MalformedEnvelope)?;
        let key = FernetKey::from(&derive_key(self.settings.shared_secret.expose(), referral_code));
        let payload = key
            .decrypt(&sealed, self.settings.envelope_ttl(), self.clock.now_secs())
            .map_err(|e| {
                tracing::debug!("Envelope rejected: {}", e);
                AuthError::MalformedEnvelope
            })?;

        let auth_token = payload
            .field_str("auth_token")
            .ok_or(AuthError::InvalidTokenFormat)?;
        let decoded = padded_base64_decode(auth_token).map_err(|_| AuthError::InvalidTokenFormat)?;
        let (endpoint, timestamp) = split_signed(&decoded, &self.settings.constant_words)?;

        let age = self.clock.now_secs().abs_diff(timestamp);
        if age > self.settings.token_validity_window_seconds {
            tracing::debug!(endpoint, timestamp, age, "Token outside validity window");
            return Err(AuthError::TokenExpired);
        }

        Ok(VerifiedToken {
            endpoint: endpoint.to_string(),
            timestamp,
            verified: true,
        })
    }

    /// Same checks, but any failure just means an anonymous caller
    pub fn optional_verify(&self, header: Option<&str>) -> Option<VerifiedToken> {
        match self.verify(header) {
            Ok(token) => Some(token),
            Err(e) => {
                tracing::trace!(kind = e.code(), "Proceeding unauthenticated");
                None
            }
        }
    }
}

/// Token text after the `Bearer ` prefix
pub fn extract_bearer(header: Option<&str>) -> Result<&str, AuthError> {
    let token = header
        .and_then(|value| value.strip_prefix(BEARER_PREFIX))
        .ok_or(AuthError::MissingToken)?
        .trim();

    if token.is_empty() {
        return Err(AuthError::EmptyToken);
    }
    Ok(token)
}

/// Split `<endpoint><10 digits><constant words>` at the last occurrence of
/// the constant words. Anything after that occurrence is ignored.
pub fn split_signed<'a>(decoded: &'a str, constant_words: &str) -> Result<(&'a str, i64), AuthError> {
    let suffix_at = decoded
        .rfind(constant_words)
        .ok_or(AuthError::InvalidSignature)?;
    let head = &decoded[..suffix_at];

    let digits_at = head
        .len()
        .checked_sub(TIMESTAMP_DIGITS)
        .ok_or(AuthError::InvalidTimestamp)?;
    if !head.as_bytes()[digits_at..].iter().all(u8::is_ascii_digit) {
        return Err(AuthError::InvalidTimestamp);
    }

    // All-ASCII tail, so digits_at is a char boundary
    let timestamp = head[digits_at..]
        .parse::<i64>()
        .map_err(|_| AuthError::InvalidTimestamp)?;
    Ok((&head[..digits_at], timestamp))
}
