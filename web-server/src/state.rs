// web-server/src/state.rs
use farm_common::auth::{Clock, SystemClock, TokenIssuer, TokenVerifier};
use farm_common::Config;
use std::sync::Arc;

/// Shared per-process state handed to every worker
pub struct AppState {
    pub verifier: Arc<TokenVerifier>,
    pub issuer: TokenIssuer,
    pub accept_caller_referral: bool,
    pub enforce_endpoint_match: bool,
    pub expose_issuer: bool,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &Config, clock: Arc<dyn Clock>) -> Self {
        let settings = Arc::new(config.auth.clone());
        Self {
            verifier: Arc::new(TokenVerifier::new(settings.clone(), clock.clone())),
            issuer: TokenIssuer::new(settings, clock),
            accept_caller_referral: config.auth.accept_caller_referral,
            enforce_endpoint_match: config.auth.enforce_endpoint_match,
            expose_issuer: config.auth.expose_issuer,
        }
    }
}
