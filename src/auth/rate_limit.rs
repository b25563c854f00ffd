use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;

use crate::auth::middleware::AuthUser;
use crate::error::AppError;
use crate::AppState;

/// Public contact form: 5 submissions per IP per hour.
pub const CONTACT_LIMIT: RateLimit = RateLimit {
    max_requests: 5,
    window: Duration::from_secs(3600),
};

/// Fixed-window limit.
#[derive(Debug, Clone, Copy)]
pub struct RateLimit {
    pub max_requests: u32,
    pub window: Duration,
}

impl RateLimit {
    pub fn per_minute(max_requests: u32) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(60),
        }
    }
}

/// In-memory rate limit state (single-instance deployments only).
#[derive(Clone, Default)]
pub struct RateLimitState {
    entries: Arc<Mutex<HashMap<String, RateLimitEntry>>>,
}

struct RateLimitEntry {
    count: u32,
    window_start: Instant,
    window: Duration,
}

impl RateLimitState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a request against `key`. Returns the remaining budget, or how
    /// long to wait when the window is exhausted.
    pub async fn check(&self, key: &str, limit: RateLimit) -> Result<u32, Duration> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();

        let entry = entries.entry(key.to_string()).or_insert(RateLimitEntry {
            count: 0,
            window_start: now,
            window: limit.window,
        });

        if now.duration_since(entry.window_start) > limit.window {
            entry.count = 0;
            entry.window_start = now;
            entry.window = limit.window;
        }

        if entry.count >= limit.max_requests {
            return Err(limit
                .window
                .saturating_sub(now.duration_since(entry.window_start)));
        }

        entry.count += 1;
        Ok(limit.max_requests - entry.count)
    }

    /// Drop entries whose window ended at least one window ago.
    pub async fn cleanup(&self) -> usize {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let before = entries.len();
        entries.retain(|_, entry| now.duration_since(entry.window_start) < entry.window * 2);
        before - entries.len()
    }

    pub fn spawn_cleanup_worker(&self) {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(300));
            loop {
                interval.tick().await;
                let removed = limiter.cleanup().await;
                if removed > 0 {
                    tracing::debug!(removed, "Rate limit entries purged");
                }
            }
        });
    }
}

async fn enforce(
    state: &AppState,
    key: String,
    limit: RateLimit,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    match state.rate_limiter.check(&key, limit).await {
        Ok(remaining) => {
            tracing::debug!(key = %key, remaining, "Rate limit check passed");
            Ok(next.run(req).await)
        }
        Err(retry_after) => {
            tracing::warn!(
                key = %key,
                retry_after_secs = retry_after.as_secs(),
                "Rate limit exceeded"
            );
            Err(AppError::RateLimited)
        }
    }
}

/// Per-IP limit for the public contact form.
pub async fn rate_limit_contact(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let key = format!("contact:{}", addr.ip());
    enforce(&state, key, CONTACT_LIMIT, req, next).await
}

/// Per-user limit for endpoints that call the text-generation service.
/// Must run inside `require_auth`.
pub async fn rate_limit_generation(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let identity = req
        .extensions()
        .get::<AuthUser>()
        .map(|u| u.identity_id.clone())
        .ok_or(AppError::Unauthorized)?;
    let key = format!("ai:{identity}");
    let limit = RateLimit::per_minute(state.config.ai_rate_limit_per_minute);
    enforce(&state, key, limit, req, next).await
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMIT: RateLimit = RateLimit {
        max_requests: 3,
        window: Duration::from_secs(60),
    };

    #[tokio::test]
    async fn test_allows_under_limit() {
        let limiter = RateLimitState::new();
        for i in 0..LIMIT.max_requests {
            let result = limiter.check("ai:user_1", LIMIT).await;
            assert_eq!(result, Ok(LIMIT.max_requests - i - 1));
        }
    }

    #[tokio::test]
    async fn test_blocks_over_limit() {
        let limiter = RateLimitState::new();
        for _ in 0..LIMIT.max_requests {
            let _ = limiter.check("ai:user_1", LIMIT).await;
        }
        let retry_after = limiter.check("ai:user_1", LIMIT).await.unwrap_err();
        assert!(retry_after <= LIMIT.window);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let limiter = RateLimitState::new();
        for _ in 0..LIMIT.max_requests {
            let _ = limiter.check("contact:10.0.0.1", LIMIT).await;
        }
        assert!(limiter.check("contact:10.0.0.2", LIMIT).await.is_ok());
    }

    #[tokio::test]
    async fn test_window_resets() {
        let limiter = RateLimitState::new();
        let short = RateLimit {
            max_requests: 1,
            window: Duration::from_millis(20),
        };
        assert!(limiter.check("k", short).await.is_ok());
        assert!(limiter.check("k", short).await.is_err());
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(limiter.check("k", short).await.is_ok());
    }

    #[tokio::test]
    async fn test_cleanup_drops_stale_entries() {
        let limiter = RateLimitState::new();
        let short = RateLimit {
            max_requests: 5,
            window: Duration::from_millis(10),
        };
        let _ = limiter.check("stale", short).await;
        let _ = limiter.check("fresh", LIMIT).await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(limiter.cleanup().await, 1);
    }
}
