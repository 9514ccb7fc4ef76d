// common/src/config.rs
use config::{Config as ConfigFile, Environment, File};
use serde::Deserialize;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::auth::{
    CLIENT_TOKEN_CACHE_MS, CONSTANT_WORDS, DEFAULT_REFERRAL_CODE, TOKEN_VALIDITY_WINDOW_SECONDS,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("shared secret is not configured (set APP_AUTH__SHARED_SECRET or SHARED_SECRET)")]
    MissingSecret,

    #[error("constant words must not be empty")]
    EmptyConstantWords,

    #[error("token validity window must be positive")]
    InvalidWindow,

    #[error("client token cache ({cache_ms}ms) must be shorter than the validity window ({window_ms}ms)")]
    CacheOutlivesWindow { cache_ms: u64, window_ms: u64 },
}

/// Secret shared by token issuers and verifiers.
///
/// Zeroized on drop and redacted from `Debug`. Deliberately not `Serialize`.
#[derive(Clone, Default, Deserialize)]
#[serde(from = "String")]
pub struct SharedSecret(Zeroizing<Vec<u8>>);

impl SharedSecret {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Zeroizing::new(bytes.into()))
    }

    pub fn expose(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for SharedSecret {
    fn from(secret: String) -> Self {
        Self::new(secret.into_bytes())
    }
}

impl From<&str> for SharedSecret {
    fn from(secret: &str) -> Self {
        Self::new(secret.as_bytes())
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedSecret([REDACTED])")
    }
}

/// Central configuration for the API server
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub web_server_addr: String,
    pub auth: AuthConfig,
}

/// Bearer-token protocol settings
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub shared_secret: SharedSecret,
    /// Key-derivation salt used when a caller supplies no referral code
    pub default_referral_code: String,
    /// Literal suffix closing the signed inner string
    pub constant_words: String,
    /// Symmetric acceptance window around the embedded timestamp
    pub token_validity_window_seconds: u64,
    /// Client-side reuse period for an issued token
    pub client_token_cache_ms: u64,
    /// Max age enforced by the envelope itself, 0 disables it
    pub envelope_ttl_seconds: u64,
    /// Derive the verification key from the caller's `X-Referral-Code` header
    pub accept_caller_referral: bool,
    /// Reject tokens whose embedded endpoint differs from the request path
    pub enforce_endpoint_match: bool,
    /// Serve `POST /api/token` for internal callers
    pub expose_issuer: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            web_server_addr: "127.0.0.1:8081".to_string(),
            auth: AuthConfig::default(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            shared_secret: SharedSecret::default(),
            default_referral_code: DEFAULT_REFERRAL_CODE.to_string(),
            constant_words: CONSTANT_WORDS.to_string(),
            token_validity_window_seconds: TOKEN_VALIDITY_WINDOW_SECONDS,
            client_token_cache_ms: CLIENT_TOKEN_CACHE_MS,
            envelope_ttl_seconds: 0,
            accept_caller_referral: false,
            enforce_endpoint_match: false,
            expose_issuer: false,
        }
    }
}

impl AuthConfig {
    /// Defaults around an explicit secret
    pub fn with_secret(secret: impl Into<SharedSecret>) -> Self {
        Self {
            shared_secret: secret.into(),
            ..Self::default()
        }
    }

    pub fn envelope_ttl(&self) -> Option<u64> {
        (self.envelope_ttl_seconds > 0).then_some(self.envelope_ttl_seconds)
    }

    /// Startup checks; a server must not run without these holding
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.shared_secret.is_empty() {
            return Err(ConfigError::MissingSecret);
        }
        if self.constant_words.is_empty() {
            return Err(ConfigError::EmptyConstantWords);
        }
        if self.token_validity_window_seconds == 0 {
            return Err(ConfigError::InvalidWindow);
        }
        let window_ms = self.token_validity_window_seconds.saturating_mul(1000);
        if self.client_token_cache_ms >= window_ms {
            return Err(ConfigError::CacheOutlivesWindow {
                cache_ms: self.client_token_cache_ms,
                window_ms,
            });
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let config_dir = env::var("CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                // Binaries run from the workspace root or from a member crate
                let mut path = PathBuf::from("./config");
                if !path.exists() {
                    path = PathBuf::from("../config");
                }
                path
            });

        tracing::info!("Loading configuration from {}", config_dir.display());
        tracing::info!("Using run mode: {}", run_mode);

        Self::layered(&config_dir, &run_mode, app_environment())
    }

    fn layered(config_dir: &Path, run_mode: &str, environment: Environment) -> Result<Self, ConfigError> {
        let config: Config = ConfigFile::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join(format!("{}.toml", run_mode))).required(false))
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            .add_source(environment)
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Layered load, falling back to flat environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        match Self::load() {
            Ok(config) => {
                tracing::info!("Configuration loaded from files and environment");
                Ok(config)
            }
            Err(e) => {
                tracing::warn!("Failed to load layered configuration: {}", e);
                tracing::info!("Falling back to environment variables only");

                let config = Self::from_vars(|name| env::var(name).ok());
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Build from flat variables such as `SHARED_SECRET`
    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = AuthConfig::default();
        let flag = |name: &str, default: bool| {
            lookup(name)
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(default)
        };

        Self {
            web_server_addr: lookup("WEB_SERVER_ADDR")
                .unwrap_or_else(|| "127.0.0.1:8081".to_string()),
            auth: AuthConfig {
                shared_secret: lookup("SHARED_SECRET").map(SharedSecret::from).unwrap_or_default(),
                default_referral_code: lookup("DEFAULT_REFERRAL_CODE")
                    .unwrap_or(defaults.default_referral_code),
                constant_words: lookup("CONSTANT_WORDS").unwrap_or(defaults.constant_words),
                token_validity_window_seconds: parsed(
                    &lookup,
                    "TOKEN_VALIDITY_WINDOW_SECONDS",
                    defaults.token_validity_window_seconds,
                ),
                client_token_cache_ms: parsed(
                    &lookup,
                    "CLIENT_TOKEN_CACHE_MS",
                    defaults.client_token_cache_ms,
                ),
                envelope_ttl_seconds: parsed(
                    &lookup,
                    "ENVELOPE_TTL_SECONDS",
                    defaults.envelope_ttl_seconds,
                ),
                accept_caller_referral: flag("ACCEPT_CALLER_REFERRAL", defaults.accept_caller_referral),
                enforce_endpoint_match: flag("ENFORCE_ENDPOINT_MATCH", defaults.enforce_endpoint_match),
                expose_issuer: flag("EXPOSE_ISSUER", defaults.expose_issuer),
            },
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.auth.validate()
    }
}

/// `APP_AUTH__SHARED_SECRET` style variables. Values stay strings so secrets
/// such as `007` or `TRUE` reach key derivation untouched.
fn app_environment() -> Environment {
    Environment::with_prefix("APP")
        .prefix_separator("_")
        .separator("__")
}

fn parsed<F, T>(lookup: &F, name: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(name)
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_have_no_secret() {
        let config = Config::default();
        assert!(config.auth.shared_secret.is_empty());
        assert!(matches!(config.validate(), Err(ConfigError::MissingSecret)));
        assert_eq!(config.auth.default_referral_code, "LighterFarmSecureAPI");
        assert_eq!(config.auth.constant_words, "LighterFarmSecureAPI");
        assert_eq!(config.auth.token_validity_window_seconds, 300);
        assert_eq!(config.auth.client_token_cache_ms, 240_000);
        assert_eq!(config.auth.envelope_ttl(), None);
    }

    #[test]
    fn test_from_vars_reads_flat_names() {
        let config = Config::from_vars(vars(&[
            ("SHARED_SECRET", "s3cret"),
            ("TOKEN_VALIDITY_WINDOW_SECONDS", "120"),
            ("CLIENT_TOKEN_CACHE_MS", "90000"),
            ("ACCEPT_CALLER_REFERRAL", "TRUE"),
            ("ENVELOPE_TTL_SECONDS", "not a number"),
        ]));

        assert_eq!(config.auth.shared_secret.expose(), b"s3cret");
        assert_eq!(config.auth.token_validity_window_seconds, 120);
        assert_eq!(config.auth.client_token_cache_ms, 90_000);
        assert!(config.auth.accept_caller_referral);
        assert!(!config.auth.expose_issuer);
        assert_eq!(config.auth.envelope_ttl_seconds, 0);
        assert!(config.validate().is_ok());
    }

    fn load_with_env(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let source: config::Map<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::layered(
            Path::new("no-such-config-dir"),
            "test",
            app_environment().source(Some(source)),
        )
    }

    #[test]
    fn test_environment_secret_kept_verbatim() {
        for secret in ["007", "TRUE", "1e5", "s3cret"] {
            let config = load_with_env(&[
                ("APP_AUTH__SHARED_SECRET", secret),
                ("APP_AUTH__DEFAULT_REFERRAL_CODE", "0042"),
            ])
            .unwrap();
            assert_eq!(config.auth.shared_secret.expose(), secret.as_bytes());
            assert_eq!(config.auth.default_referral_code, "0042");
        }
    }

    #[test]
    fn test_environment_numbers_and_flags_still_parse() {
        let config = load_with_env(&[
            ("APP_AUTH__SHARED_SECRET", "s3cret"),
            ("APP_AUTH__TOKEN_VALIDITY_WINDOW_SECONDS", "120"),
            ("APP_AUTH__CLIENT_TOKEN_CACHE_MS", "90000"),
            ("APP_AUTH__EXPOSE_ISSUER", "true"),
        ])
        .unwrap();
        assert_eq!(config.auth.token_validity_window_seconds, 120);
        assert_eq!(config.auth.client_token_cache_ms, 90_000);
        assert!(config.auth.expose_issuer);
    }

    #[test]
    fn test_cache_must_expire_before_window() {
        let mut auth = AuthConfig::with_secret("s3cret");
        auth.client_token_cache_ms = 300_000;
        assert!(matches!(
            auth.validate(),
            Err(ConfigError::CacheOutlivesWindow { cache_ms: 300_000, window_ms: 300_000 })
        ));

        auth.client_token_cache_ms = 299_999;
        assert!(auth.validate().is_ok());

        auth.token_validity_window_seconds = 0;
        assert!(matches!(auth.validate(), Err(ConfigError::InvalidWindow)));
    }

    #[test]
    fn test_empty_constant_words_rejected() {
        let mut auth = AuthConfig::with_secret("s3cret");
        auth.constant_words.clear();
        assert!(matches!(auth.validate(), Err(ConfigError::EmptyConstantWords)));
    }

    #[test]
    fn test_secret_never_printed() {
        let config = Config::from_vars(vars(&[("SHARED_SECRET", "hunter2")]));
        let printed = format!("{:?}", config);
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("[REDACTED]"));
    }
}
