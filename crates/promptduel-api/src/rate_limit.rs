use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::config::AppConfig;
use crate::error::AppError;

/// Fixed-window limiter for the endpoints that accept anonymous or
/// high-frequency traffic. Votes are keyed by client IP, authenticated
/// mutations by user id.
#[derive(Clone)]
pub struct EndpointRateLimiter {
    state: Arc<Mutex<HashMap<String, RateWindow>>>,
    window: Duration,
    vote_limit: u32,
    mutation_limit: u32,
    metrics: Arc<RateLimitMetrics>,
}

#[derive(Clone, Copy)]
pub enum ProtectedEndpoint {
    Vote,
    Mutation,
}

#[derive(Default)]
struct RateLimitMetrics {
    vote_allowed: AtomicU64,
    vote_limited: AtomicU64,
    mutation_allowed: AtomicU64,
    mutation_limited: AtomicU64,
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct RateLimitMetricsSnapshot {
    pub vote_allowed: u64,
    pub vote_limited: u64,
    pub mutation_allowed: u64,
    pub mutation_limited: u64,
}

#[derive(Debug, Clone, Copy)]
struct RateWindow {
    started_at: Instant,
    count: u32,
}

impl EndpointRateLimiter {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(HashMap::new())),
            window: config.rate_limit_window,
            vote_limit: config.vote_rate_limit_per_window,
            mutation_limit: config.mutation_rate_limit_per_window,
            metrics: Arc::new(RateLimitMetrics::default()),
        }
    }

    pub async fn check(&self, endpoint: ProtectedEndpoint, principal: &str) -> Result<(), AppError> {
        let limit = match endpoint {
            ProtectedEndpoint::Vote => self.vote_limit,
            ProtectedEndpoint::Mutation => self.mutation_limit,
        };

        let key = format!("{}:{principal}", endpoint.label());
        let now = Instant::now();
        let mut guard = self.state.lock().await;
        let entry = guard.entry(key).or_insert(RateWindow {
            started_at: now,
            count: 0,
        });

        if now.duration_since(entry.started_at) >= self.window {
            entry.started_at = now;
            entry.count = 0;
        }

        if entry.count >= limit {
            let retry_after_secs = self
                .window
                .saturating_sub(now.duration_since(entry.started_at))
                .as_secs();
            self.mark_limited(endpoint);
            tracing::warn!(
                endpoint = endpoint.label(),
                principal = principal_fingerprint(principal),
                retry_after_secs,
                "Rate limit exceeded"
            );
            return Err(AppError::too_many_requests(
                "Rate limit exceeded for protected endpoint",
                retry_after_secs,
            ));
        }

        entry.count += 1;
        self.mark_allowed(endpoint);
        Ok(())
    }

    pub fn metrics_snapshot(&self) -> RateLimitMetricsSnapshot {
        RateLimitMetricsSnapshot {
            vote_allowed: self.metrics.vote_allowed.load(Ordering::Relaxed),
            vote_limited: self.metrics.vote_limited.load(Ordering::Relaxed),
            mutation_allowed: self.metrics.mutation_allowed.load(Ordering::Relaxed),
            mutation_limited: self.metrics.mutation_limited.load(Ordering::Relaxed),
        }
    }

    fn mark_allowed(&self, endpoint: ProtectedEndpoint) {
        match endpoint {
            ProtectedEndpoint::Vote => {
                self.metrics.vote_allowed.fetch_add(1, Ordering::Relaxed);
            }
            ProtectedEndpoint::Mutation => {
                self.metrics.mutation_allowed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn mark_limited(&self, endpoint: ProtectedEndpoint) {
        match endpoint {
            ProtectedEndpoint::Vote => {
                self.metrics.vote_limited.fetch_add(1, Ordering::Relaxed);
            }
            ProtectedEndpoint::Mutation => {
                self.metrics.mutation_limited.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

impl ProtectedEndpoint {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Vote => "vote",
            Self::Mutation => "mutation",
        }
    }
}

fn principal_fingerprint(principal: &str) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    principal.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rate_limiter_blocks_after_limit() {
        let limiter = EndpointRateLimiter {
            state: Arc::new(Mutex::new(HashMap::new())),
            window: Duration::from_secs(60),
            vote_limit: 2,
            mutation_limit: 2,
            metrics: Arc::new(RateLimitMetrics::default()),
        };

        limiter
            .check(ProtectedEndpoint::Vote, "203.0.113.9")
            .await
            .unwrap();
        limiter
            .check(ProtectedEndpoint::Vote, "203.0.113.9")
            .await
            .unwrap();

        let err = limiter
            .check(ProtectedEndpoint::Vote, "203.0.113.9")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::TooManyRequests(_, _)));

        let metrics = limiter.metrics_snapshot();
        assert_eq!(metrics.vote_allowed, 2);
        assert_eq!(metrics.vote_limited, 1);
    }

    #[tokio::test]
    async fn rate_limiter_tracks_principals_independently() {
        let limiter = EndpointRateLimiter {
            state: Arc::new(Mutex::new(HashMap::new())),
            window: Duration::from_secs(60),
            vote_limit: 1,
            mutation_limit: 1,
            metrics: Arc::new(RateLimitMetrics::default()),
        };

        limiter
            .check(ProtectedEndpoint::Vote, "203.0.113.9")
            .await
            .unwrap();
        limiter
            .check(ProtectedEndpoint::Vote, "198.51.100.4")
            .await
            .unwrap();
    }
}
