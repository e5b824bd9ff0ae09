//! OAuth access-token cache with single-flight refresh.
//!
//! Adapter instances are shared across concurrent callers, so the cache
//! guards refreshes with an async mutex held across the refresh call:
//! one in-flight token request is awaited by every concurrent caller
//! instead of each triggering its own. Expiry is checked at each call
//! site with a skew so tokens are replaced shortly before the provider
//! would reject them; there is no background timer.

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

/// Refresh this long before the provider-reported expiry.
const EXPIRY_SKEW_SECS: i64 = 60;

/// A cached access token with its absolute expiry.
#[derive(Debug, Clone)]
pub struct CachedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    /// Builds a cached token from a provider `expires_in` (seconds).
    pub fn new(token: impl Into<String>, expires_in_secs: i64) -> Self {
        Self {
            token: token.into(),
            expires_at: Utc::now() + Duration::seconds(expires_in_secs),
        }
    }

    /// Fresh means usable for at least the skew window.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_SKEW_SECS) < self.expires_at
    }
}

/// Instance-local token cache. One per API client.
#[derive(Default)]
pub struct AccessTokenCache {
    slot: Mutex<Option<CachedToken>>,
}

impl AccessTokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached token if still fresh, otherwise runs `refresh`
    /// exactly once while concurrent callers wait on the lock.
    pub async fn get_or_refresh<F, Fut, E>(&self, refresh: F) -> Result<String, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CachedToken, E>>,
    {
        let mut slot = self.slot.lock().await;
        if let Some(cached) = slot.as_ref() {
            if cached.is_fresh(Utc::now()) {
                return Ok(cached.token.clone());
            }
        }
        let fresh = refresh().await?;
        let token = fresh.token.clone();
        *slot = Some(fresh);
        Ok(token)
    }

    /// Drops the cached token, forcing a refresh on the next call.
    pub async fn invalidate(&self) {
        *self.slot.lock().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_freshness_respects_skew() {
        let token = CachedToken::new("t", 3600);
        assert!(token.is_fresh(Utc::now()));

        // Expires inside the skew window: treated as stale.
        let token = CachedToken::new("t", 30);
        assert!(!token.is_fresh(Utc::now()));
    }

    #[tokio::test]
    async fn test_cached_token_reused() {
        let cache = AccessTokenCache::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let token: Result<_, std::convert::Infallible> = cache
                .get_or_refresh(|| async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(CachedToken::new("tok-1", 3600))
                })
                .await;
            assert_eq!(token.unwrap(), "tok-1");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_refresh() {
        let cache = Arc::new(AccessTokenCache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                let token: Result<_, std::convert::Infallible> = cache
                    .get_or_refresh(|| async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                        Ok(CachedToken::new("tok-shared", 3600))
                    })
                    .await;
                token.unwrap()
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap(), "tok-shared");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refresh() {
        let cache = AccessTokenCache::new();
        let calls = AtomicUsize::new(0);

        let refresh = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, std::convert::Infallible>(CachedToken::new("tok", 3600))
        };

        cache.get_or_refresh(refresh).await.unwrap();
        cache.invalidate().await;
        cache
            .get_or_refresh(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, std::convert::Infallible>(CachedToken::new("tok", 3600))
            })
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
