// common/src/auth/envelope.rs
//! Fernet-compatible symmetric envelope.
//!
//! # Token layout
//!
//! ```text
//! [0x80] || [timestamp: u64 BE] || [IV: 16 bytes] || [AES-128-CBC ciphertext] || [HMAC-SHA256: 32 bytes]
//! ```
//!
//! The whole blob is URL-safe base64 with padding. The 32-byte key splits into
//! `key[0..16]` for HMAC signing and `key[16..32]` for AES encryption.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;
use zeroize::Zeroizing;

use super::encoding::pad_base64;

type HmacSha256 = Hmac<Sha256>;
type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

const VERSION: u8 = 0x80;
const IV_LEN: usize = 16;
const HMAC_LEN: usize = 32;
const BLOCK_LEN: usize = 16;
// version + timestamp + IV
const HEADER_LEN: usize = 1 + 8 + IV_LEN;
// Accepted distance into the future when a TTL is enforced
const MAX_CLOCK_SKEW_SECS: i64 = 60;

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("envelope key must be 32 bytes of URL-safe base64")]
    InvalidKey,

    #[error("envelope is not valid base64")]
    Base64(#[from] base64::DecodeError),

    #[error("envelope too short")]
    TooShort,

    #[error("unsupported envelope version {0:#04x}")]
    UnsupportedVersion(u8),

    #[error("envelope HMAC mismatch")]
    InvalidHmac,

    #[error("envelope ciphertext padding invalid")]
    InvalidPadding,

    #[error("envelope plaintext is not UTF-8")]
    InvalidUtf8,

    #[error("envelope outside its time-to-live")]
    Expired,

    #[error("payload serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// SHA-256 of the shared secret followed by the referral code
pub struct DerivedKey(Zeroizing<[u8; 32]>);

impl DerivedKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// URL-safe base64 form accepted by [`FernetKey::from_base64`]
    pub fn to_base64(&self) -> String {
        base64::encode_config(&self.0[..], base64::URL_SAFE)
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DerivedKey([REDACTED])")
    }
}

/// Plain concatenation, no domain separation between the two inputs.
pub fn derive_key(secret: &[u8], referral_code: &str) -> DerivedKey {
    let mut hasher = Sha256::new();
    hasher.update(secret);
    hasher.update(referral_code.as_bytes());

    let mut key = Zeroizing::new([0u8; 32]);
    key.copy_from_slice(&hasher.finalize());
    DerivedKey(key)
}

/// Split signing/encryption key pair
pub struct FernetKey {
    signing_key: Zeroizing<[u8; 16]>,
    encryption_key: Zeroizing<[u8; 16]>,
}

impl FernetKey {
    pub fn new(key: &[u8; 32]) -> Self {
        let mut signing_key = Zeroizing::new([0u8; 16]);
        let mut encryption_key = Zeroizing::new([0u8; 16]);
        signing_key.copy_from_slice(&key[..16]);
        encryption_key.copy_from_slice(&key[16..]);
        Self {
            signing_key,
            encryption_key,
        }
    }

    pub fn from_base64(key: &str) -> Result<Self, EnvelopeError> {
        let bytes = Zeroizing::new(
            base64::decode_config(pad_base64(key.trim()), base64::URL_SAFE)
                .map_err(|_| EnvelopeError::InvalidKey)?,
        );
        let key: &[u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| EnvelopeError::InvalidKey)?;
        Ok(Self::new(key))
    }

    /// Seal `plaintext` with a fresh random IV, stamped with `now` (Unix seconds)
    pub fn encrypt(&self, plaintext: &[u8], now: i64) -> Result<String, EnvelopeError> {
        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut iv);
        self.encrypt_with_iv(plaintext, now, &iv)
    }

    // Fixed IVs only come from the vector tests
    fn encrypt_with_iv(
        &self,
        plaintext: &[u8],
        now: i64,
        iv: &[u8; IV_LEN],
    ) -> Result<String, EnvelopeError> {
        let ciphertext = Aes128CbcEnc::new_from_slices(&self.encryption_key[..], &iv[..])
            .map_err(|_| EnvelopeError::InvalidKey)?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext);

        let mut token = Vec::with_capacity(HEADER_LEN + ciphertext.len() + HMAC_LEN);
        token.push(VERSION);
        token.extend_from_slice(&(now.max(0) as u64).to_be_bytes());
        token.extend_from_slice(iv);
        token.extend_from_slice(&ciphertext);

        let mut mac = self.mac()?;
        mac.update(&token);
        token.extend_from_slice(&mac.finalize().into_bytes());

        Ok(base64::encode_config(&token, base64::URL_SAFE))
    }

    /// Open a sealed token.
    ///
    /// `ttl` of `None` skips the envelope's own age check entirely. With a TTL,
    /// tokens older than `ttl` seconds or stamped more than a minute ahead of
    /// `now` are rejected. The HMAC is always checked before any decryption.
    pub fn decrypt(&self, token: &str, ttl: Option<u64>, now: i64) -> Result<Payload, EnvelopeError> {
        let data = base64::decode_config(pad_base64(token.trim()), base64::URL_SAFE)?;
        if data.len() < HEADER_LEN + HMAC_LEN {
            return Err(EnvelopeError::TooShort);
        }
        if data[0] != VERSION {
            return Err(EnvelopeError::UnsupportedVersion(data[0]));
        }

        let (signed, tag) = data.split_at(data.len() - HMAC_LEN);
        let mut mac = self.mac()?;
        mac.update(signed);
        mac.verify_slice(tag).map_err(|_| EnvelopeError::InvalidHmac)?;

        let mut stamp = [0u8; 8];
        stamp.copy_from_slice(&signed[1..9]);
        let timestamp = i64::try_from(u64::from_be_bytes(stamp)).unwrap_or(i64::MAX);
        if let Some(ttl) = ttl {
            let ttl = i64::try_from(ttl).unwrap_or(i64::MAX);
            if timestamp.saturating_add(ttl) < now {
                return Err(EnvelopeError::Expired);
            }
            if now.saturating_add(MAX_CLOCK_SKEW_SECS) < timestamp {
                return Err(EnvelopeError::Expired);
            }
        }

        let iv = &signed[9..HEADER_LEN];
        let ciphertext = &signed[HEADER_LEN..];
        if ciphertext.is_empty() || ciphertext.len() % BLOCK_LEN != 0 {
            return Err(EnvelopeError::InvalidPadding);
        }

        let plaintext = Aes128CbcDec::new_from_slices(&self.encryption_key[..], iv)
            .map_err(|_| EnvelopeError::InvalidKey)?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| EnvelopeError::InvalidPadding)?;

        let text = String::from_utf8(plaintext).map_err(|_| EnvelopeError::InvalidUtf8)?;
        Ok(Payload::from_text(text))
    }

    fn mac(&self) -> Result<HmacSha256, EnvelopeError> {
        HmacSha256::new_from_slice(&self.signing_key[..]).map_err(|_| EnvelopeError::InvalidKey)
    }
}

impl From<&DerivedKey> for FernetKey {
    fn from(key: &DerivedKey) -> Self {
        Self::new(key.as_bytes())
    }
}

impl fmt::Debug for FernetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FernetKey([REDACTED])")
    }
}

/// Seal a payload under a base64 key string
pub fn encrypt(payload: &[u8], key_b64: &str, now: i64) -> Result<String, EnvelopeError> {
    FernetKey::from_base64(key_b64)?.encrypt(payload, now)
}

/// Open a token sealed by [`encrypt`]
pub fn decrypt(token: &str, key_b64: &str, ttl: Option<u64>, now: i64) -> Result<Payload, EnvelopeError> {
    FernetKey::from_base64(key_b64)?.decrypt(token, ttl, now)
}

/// Decrypted envelope contents.
///
/// Plaintext that is not JSON is kept as `Raw` instead of failing, since
/// callers may seal arbitrary text.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Parsed(Value),
    Raw(String),
}

impl Payload {
    fn from_text(text: String) -> Self {
        match serde_json::from_str(&text) {
            Ok(value) => Payload::Parsed(value),
            Err(_) => Payload::Raw(text),
        }
    }

    /// String field of a parsed JSON object
    pub fn field_str(&self, name: &str) -> Option<&str> {
        match self {
            Payload::Parsed(value) => value.get(name)?.as_str(),
            Payload::Raw(_) => None,
        }
    }

    /// JSON view; raw text becomes `{ "raw_data": <text> }`
    pub fn into_json(self) -> Value {
        match self {
            Payload::Parsed(value) => value,
            Payload::Raw(text) => json!({ "raw_data": text }),
        }
    }
}
