//! Async token-bucket rate limiting (spec §4.1 "Rate limiting").
//!
//! Grounded on `r2e-rate-limit/src/lib.rs`'s `RateLimiter<K>` — the
//! refill-and-consume math is unchanged — generalized to an async
//! `acquire().await` instead of the teacher's sync `try_acquire`, since
//! source API calls must *wait* for a token rather than be rejected: "the
//! limiter is the only place backoff lives — callers do not sleep."

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use ingestgraph_types::ConnectorId;
use tokio::sync::Mutex;

struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

fn refill(tokens: &mut f64, last_refill: &mut Instant, max_tokens: f64, window: Duration) {
    let now = Instant::now();
    let elapsed = now.duration_since(*last_refill);
    let refill_amount = (elapsed.as_secs_f64() / window.as_secs_f64()) * max_tokens;
    *tokens = (*tokens + refill_amount).min(max_tokens);
    *last_refill = now;
}

/// One connector instance's rate limiter — shared across all scopes of that
/// instance (spec §5 "Shared resources").
pub struct RateLimiter {
    bucket: Mutex<TokenBucket>,
    max_tokens: f64,
    window: Duration,
}

impl RateLimiter {
    /// Allow `max` requests per `window` (e.g. `RateLimiter::new(50, Duration::from_secs(1))`
    /// for Dropbox's 50 req/s).
    pub fn new(max: u64, window: Duration) -> Self {
        RateLimiter {
            bucket: Mutex::new(TokenBucket { tokens: max as f64, last_refill: Instant::now() }),
            max_tokens: max as f64,
            window,
        }
    }

    /// Wait until a token is available, then consume it. Every source API
    /// call acquires a token before the call; this is the only place
    /// backoff lives.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut bucket = self.bucket.lock().await;
                refill(&mut bucket.tokens, &mut bucket.last_refill, self.max_tokens, self.window);
                if bucket.tokens >= 1.0 {
                    bucket.tokens -= 1.0;
                    None
                } else {
                    let deficit = 1.0 - bucket.tokens;
                    let secs_per_token = self.window.as_secs_f64() / self.max_tokens;
                    Some(Duration::from_secs_f64(deficit * secs_per_token))
                }
            };
            match wait {
                None => return,
                Some(duration) => tokio::time::sleep(duration).await,
            }
        }
    }
}

/// One limiter per `connector_id`, shared across all scopes of that
/// instance. Keyed map so the runtime can look up (or lazily create) a
/// connector's limiter without threading it through every call site.
#[derive(Clone, Default)]
pub struct RateLimiterRegistry {
    limiters: Arc<DashMap<ConnectorId, Arc<RateLimiter>>>,
}

impl RateLimiterRegistry {
    pub fn new() -> Self {
        RateLimiterRegistry::default()
    }

    /// Get or create the limiter for a connector instance. `max`/`window`
    /// only take effect the first time a given `connector_id` is seen —
    /// subsequent calls reuse the existing bucket, matching
    /// `r2e_rate_limit::InMemoryRateLimiter`'s "first caller wins" shape.
    pub fn get_or_create(&self, connector_id: ConnectorId, max: u64, window: Duration) -> Arc<RateLimiter> {
        self.limiters.entry(connector_id).or_insert_with(|| Arc::new(RateLimiter::new(max, window))).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn acquire_does_not_wait_while_tokens_remain() {
        let limiter = RateLimiter::new(5, Duration::from_secs(1));
        for _ in 0..5 {
            limiter.acquire().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn acquire_waits_for_refill_once_exhausted() {
        let limiter = RateLimiter::new(1, Duration::from_millis(100));
        limiter.acquire().await;

        let start = tokio::time::Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(90));
    }

    #[tokio::test]
    async fn registry_reuses_limiter_per_connector() {
        let registry = RateLimiterRegistry::new();
        let connector = ConnectorId::nil();
        let a = registry.get_or_create(connector, 10, Duration::from_secs(1));
        let b = registry.get_or_create(connector, 999, Duration::from_secs(1));
        assert!(Arc::ptr_eq(&a, &b));
    }
}
