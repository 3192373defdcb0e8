//! Bearer token cache for providers with a credential handshake

use crate::core::ProviderError;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

struct Token {
    value: String,
    acquired_at: Instant,
}

/// Holds one access token and re-acquires it lazily once expired
pub struct TokenCache {
    current: Mutex<Option<Token>>,
    lifetime: Duration,
}

impl TokenCache {
    pub fn new(lifetime: Duration) -> Self {
        Self {
            current: Mutex::new(None),
            lifetime,
        }
    }

    /// Return the cached token, or run `acquire` when there is none or it expired
    ///
    /// The lock is held during `acquire` so concurrent callers share a
    /// single handshake.
    pub async fn get_or_acquire<F, Fut>(&self, acquire: F) -> Result<String, ProviderError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, ProviderError>>,
    {
        let mut guard = self.current.lock().await;
        if let Some(token) = guard.as_ref() {
            if token.acquired_at.elapsed() < self.lifetime {
                return Ok(token.value.clone());
            }
            tracing::debug!("Access token expired, re-authenticating");
        }

        let value = acquire().await?;
        *guard = Some(Token {
            value: value.clone(),
            acquired_at: Instant::now(),
        });
        Ok(value)
    }

    /// Drop the current token; the next caller performs a fresh handshake
    pub async fn invalidate(&self) {
        *self.current.lock().await = None;
    }
}
