//! Access token cache for Firestore authentication.
//!
//! Tokens are refreshed a minute before expiry. Concurrent callers share one
//! refresh, and a failed refresh falls back to the cached token while it is
//! still unexpired.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use gcp_auth::TokenProvider;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{FirestoreError, FirestoreResult};

/// Refresh this long before the token expires.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// TTL assumed when the reported expiry cannot be converted.
const TOKEN_DEFAULT_TTL: Duration = Duration::from_secs(50 * 60);

/// OAuth scope for the Firestore REST API.
pub const FIRESTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        Instant::now() + TOKEN_REFRESH_MARGIN < self.expires_at
    }

    fn is_unexpired(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Thread-safe token cache with single-flight refresh.
pub struct TokenCache {
    auth: Arc<dyn TokenProvider>,
    cache: RwLock<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new(auth: Arc<dyn TokenProvider>) -> Self {
        Self {
            auth,
            cache: RwLock::new(None),
        }
    }

    /// Drop the cached token so the next call refreshes.
    pub async fn invalidate(&self) {
        *self.cache.write().await = None;
    }

    /// Get a valid access token, refreshing if necessary.
    pub async fn get_token(&self) -> FirestoreResult<String> {
        if let Some(cached) = self.cache.read().await.as_ref() {
            if cached.is_fresh() {
                return Ok(cached.access_token.clone());
            }
        }

        let mut cache = self.cache.write().await;

        // Another task may have refreshed while we waited for the lock.
        if let Some(cached) = cache.as_ref() {
            if cached.is_fresh() {
                return Ok(cached.access_token.clone());
            }
        }

        match self.auth.token(&[FIRESTORE_SCOPE]).await {
            Ok(token) => {
                let access_token = token.as_str().to_string();
                let expires_at = expiry_instant(token.expires_at(), Utc::now());
                *cache = Some(CachedToken {
                    access_token: access_token.clone(),
                    expires_at,
                });
                debug!("Refreshed Firestore auth token");
                Ok(access_token)
            }
            Err(e) => match cache.as_ref() {
                Some(cached) if cached.is_unexpired() => {
                    warn!("Token refresh failed, using existing token: {}", e);
                    Ok(cached.access_token.clone())
                }
                _ => Err(FirestoreError::auth_error(format!(
                    "Failed to obtain auth token: {}",
                    e
                ))),
            },
        }
    }
}

/// Convert a wall-clock expiry into a monotonic deadline.
///
/// Already-expired tokens get an immediate deadline so the next call refreshes.
fn expiry_instant(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> Instant {
    if expires_at <= now {
        return Instant::now();
    }
    let ttl = (expires_at - now).to_std().unwrap_or(TOKEN_DEFAULT_TTL);
    Instant::now() + ttl
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_in_future() {
        let now = Utc::now();
        let deadline = expiry_instant(now + chrono::Duration::minutes(30), now);
        let remaining = deadline.saturating_duration_since(Instant::now());
        assert!(remaining > Duration::from_secs(29 * 60));
        assert!(remaining <= Duration::from_secs(30 * 60));
    }

    #[test]
    fn test_expired_token_is_not_fresh() {
        let now = Utc::now();
        let cached = CachedToken {
            access_token: "t".into(),
            expires_at: expiry_instant(now - chrono::Duration::minutes(1), now),
        };
        assert!(!cached.is_fresh());
    }

    #[test]
    fn test_token_inside_margin_needs_refresh() {
        let cached = CachedToken {
            access_token: "t".into(),
            expires_at: Instant::now() + Duration::from_secs(30),
        };
        assert!(!cached.is_fresh());
        assert!(cached.is_unexpired());
    }

    #[test]
    fn test_firestore_scope() {
        assert!(FIRESTORE_SCOPE.ends_with("/datastore"));
    }
}
