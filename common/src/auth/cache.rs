// common/src/auth/cache.rs
//! Client-side reuse of issued tokens.
//!
//! One slot, refreshed when it expires. The slot lock is held while a new
//! token is issued, so concurrent callers never issue twice for one miss.

use std::sync::{Mutex, MutexGuard};

use super::issuer::{TokenIssuanceError, TokenIssuer};

/// What a cached token may be reused for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheScope {
    /// Any endpoint. A token cached for one path is presented for another.
    #[default]
    Global,
    /// Only the endpoint it was issued for; another path replaces the slot
    PerEndpoint,
}

#[derive(Debug, Clone)]
struct CachedToken {
    endpoint: String,
    token: String,
    expires_at_ms: i64,
}

pub struct TokenCache {
    issuer: TokenIssuer,
    validity_ms: i64,
    scope: CacheScope,
    referral_code: Option<String>,
    slot: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    /// `validity_ms` must stay below the verifier's window
    pub fn new(issuer: TokenIssuer, validity_ms: u64) -> Self {
        Self {
            issuer,
            validity_ms: i64::try_from(validity_ms).unwrap_or(i64::MAX),
            scope: CacheScope::default(),
            referral_code: None,
            slot: Mutex::new(None),
        }
    }

    pub fn with_scope(mut self, scope: CacheScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_referral_code(mut self, referral_code: impl Into<String>) -> Self {
        self.referral_code = Some(referral_code.into());
        self
    }

    /// Cached token if still fresh, otherwise a newly issued one
    pub fn get_or_issue(&self, endpoint: &str) -> Result<String, TokenIssuanceError> {
        let mut slot = self.lock();
        let now = self.issuer.clock().now_millis();

        if let Some(cached) = slot.as_ref() {
            let reusable = match self.scope {
                CacheScope::Global => true,
                CacheScope::PerEndpoint => cached.endpoint == endpoint,
            };
            if reusable && now < cached.expires_at_ms {
                tracing::trace!(endpoint, "Token cache hit");
                return Ok(cached.token.clone());
            }
        }

        let token = self.issuer.issue(endpoint, self.referral_code.as_deref())?;
        *slot = Some(CachedToken {
            endpoint: endpoint.to_string(),
            token: token.clone(),
            expires_at_ms: now.saturating_add(self.validity_ms),
        });
        tracing::debug!(endpoint, "Token cache refreshed");

        Ok(token)
    }

    /// Drop the cached token, e.g. on logout or credential change
    pub fn clear(&self) {
        *self.lock() = None;
    }

    fn lock(&self) -> MutexGuard<'_, Option<CachedToken>> {
        // The slot only ever holds a complete value
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::ManualClock;
    use crate::config::AuthConfig;
    use std::sync::Arc;

    fn cache(clock: Arc<ManualClock>) -> TokenCache {
        let issuer = TokenIssuer::new(Arc::new(AuthConfig::with_secret("test-secret")), clock);
        TokenCache::new(issuer, 240_000)
    }

    #[test]
    fn test_reuses_within_validity() {
        let clock = Arc::new(ManualClock::at_secs(1_700_000_000));
        let cache = cache(clock.clone());

        let first = cache.get_or_issue("/api/balance").unwrap();
        clock.advance_millis(239_999);
        assert_eq!(cache.get_or_issue("/api/balance").unwrap(), first);

        clock.advance_millis(1);
        assert_ne!(cache.get_or_issue("/api/balance").unwrap(), first);
    }

    #[test]
    fn test_global_scope_ignores_endpoint() {
        let clock = Arc::new(ManualClock::at_secs(1_700_000_000));
        let cache = cache(clock);

        let first = cache.get_or_issue("/api/balance").unwrap();
        assert_eq!(cache.get_or_issue("/api/trade").unwrap(), first);
    }

    #[test]
    fn test_per_endpoint_scope_replaces_slot() {
        let clock = Arc::new(ManualClock::at_secs(1_700_000_000));
        let cache = cache(clock).with_scope(CacheScope::PerEndpoint);

        let balance = cache.get_or_issue("/api/balance").unwrap();
        assert_eq!(cache.get_or_issue("/api/balance").unwrap(), balance);

        let trade = cache.get_or_issue("/api/trade").unwrap();
        assert_ne!(trade, balance);
        assert_ne!(cache.get_or_issue("/api/balance").unwrap(), balance);
    }

    #[test]
    fn test_clear_forces_reissue() {
        let clock = Arc::new(ManualClock::at_secs(1_700_000_000));
        let cache = cache(clock);

        let first = cache.get_or_issue("/api/balance").unwrap();
        cache.clear();
        assert_ne!(cache.get_or_issue("/api/balance").unwrap(), first);
    }

    #[test]
    fn test_concurrent_misses_issue_once() {
        let clock = Arc::new(ManualClock::at_secs(1_700_000_000));
        let cache = cache(clock);

        let tokens: Vec<String> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(|| cache.get_or_issue("/api/balance").unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(tokens.windows(2).all(|pair| pair[0] == pair[1]));
    }
}
