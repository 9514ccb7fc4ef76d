// common/src/auth/encoding.rs
//! Base64 helpers shared by the issuer and the verifier.
//!
//! Two layers use standard-alphabet base64: the inner `auth_token` string and
//! the outer wrapper that turns the envelope into an opaque bearer token.
//! Some encoders drop trailing `=`, so decoding restores padding first.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Append `=` until the length is a multiple of 4
pub fn pad_base64(input: &str) -> String {
    let mut padded = input.to_string();
    while padded.len() % 4 != 0 {
        padded.push('=');
    }
    padded
}

/// Standard base64 of a UTF-8 string, always `=`-padded
pub fn padded_base64_encode(input: &str) -> String {
    pad_base64(&base64::encode(input.as_bytes()))
}

/// Decode standard base64 that may have lost its trailing padding.
///
/// Invalid UTF-8 in the decoded bytes is replaced rather than rejected; the
/// caller validates the structure of the decoded text.
pub fn padded_base64_decode(input: &str) -> Result<String, EncodingError> {
    let bytes = base64::decode(pad_base64(input.trim()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Outer transport layer around a sealed envelope
pub fn wrap_token(sealed: &str) -> String {
    base64::encode(sealed.as_bytes())
}

/// Reverse of [`wrap_token`]
pub fn unwrap_token(token: &str) -> Result<String, EncodingError> {
    padded_base64_decode(token)
}
