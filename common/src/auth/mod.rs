// common/src/auth/mod.rs
//! Bearer-token protocol shared by the API server and its clients.
//!
//! An issuer signs `<endpoint><unix seconds><constant words>`, seals it in a
//! Fernet envelope keyed by SHA-256(secret ∥ referral code) and wraps the
//! result in one more base64 layer. The verifier reverses each step and
//! accepts tokens stamped within a symmetric window of its own clock.

pub mod cache;
pub mod clock;
pub mod encoding;
pub mod envelope;
pub mod error;
pub mod issuer;
pub mod verifier;

pub use cache::{CacheScope, TokenCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use envelope::{derive_key, DerivedKey, EnvelopeError, FernetKey, Payload};
pub use error::{AuthError, StatusClass};
pub use issuer::{InnerPayload, TokenIssuanceError, TokenIssuer};
pub use verifier::{TokenVerifier, VerifiedToken, BEARER_PREFIX};

/// Referral code used when a caller supplies none
pub const DEFAULT_REFERRAL_CODE: &str = "LighterFarmSecureAPI";

/// Suffix of the signed inner string
pub const CONSTANT_WORDS: &str = "LighterFarmSecureAPI";

pub const TOKEN_VALIDITY_WINDOW_SECONDS: u64 = 300;

pub const CLIENT_TOKEN_CACHE_MS: u64 = 240_000;
