//! Per-endpoint reactive rate limiting
//!
//! Public RPC nodes and IPFS gateways throttle aggressively. A limiter
//! for an endpoint only activates after that endpoint answers 429;
//! other endpoints keep running at full speed.

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, Ordering};

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use log::debug;
use tokio::sync::RwLock;

/// Requests per second allowed to an endpoint once it has throttled us
pub const THROTTLED_RATE_PER_SECOND: u32 = 2;

/// Rate limiter state for a single endpoint.
pub struct EndpointRateLimiter {
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    active: AtomicBool,
    endpoint: String,
}

impl EndpointRateLimiter {
    /// Create a dormant limiter for an endpoint.
    pub fn new(endpoint: &str, per_second: u32) -> Self {
        let quota = Quota::per_second(NonZeroU32::new(per_second).unwrap_or(NonZeroU32::MIN));
        Self {
            limiter: RateLimiter::direct(quota),
            active: AtomicBool::new(false),
            endpoint: endpoint.to_string(),
        }
    }

    /// Activate rate limiting for this endpoint.
    pub fn activate(&self) {
        let was_active = self.active.swap(true, Ordering::SeqCst);
        if !was_active {
            debug!("Rate limiting activated for {}", self.endpoint);
        }
    }

    /// Check if rate limiting is active.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Wait for permission if rate limiting is active.
    pub async fn wait_if_active(&self) {
        if self.is_active() {
            debug!("Waiting for rate limiter on {}", self.endpoint);
            self.limiter.until_ready().await;
        }
    }
}

/// Limiters for every endpoint seen so far, created on demand.
pub struct EndpointThrottle {
    limiters: RwLock<HashMap<String, EndpointRateLimiter>>,
    per_second: u32,
}

impl Default for EndpointThrottle {
    fn default() -> Self {
        Self::new(THROTTLED_RATE_PER_SECOND)
    }
}

impl EndpointThrottle {
    pub fn new(per_second: u32) -> Self {
        Self {
            limiters: RwLock::new(HashMap::new()),
            per_second,
        }
    }

    /// Wait for permission to call `endpoint` (no-op unless it throttled us).
    pub async fn wait_for(&self, endpoint: &str) {
        let limiters = self.limiters.read().await;
        if let Some(limiter) = limiters.get(endpoint) {
            limiter.wait_if_active().await;
        }
    }

    /// Record a 429 from `endpoint`.
    pub async fn activate(&self, endpoint: &str) {
        let mut limiters = self.limiters.write().await;
        limiters
            .entry(endpoint.to_string())
            .or_insert_with(|| EndpointRateLimiter::new(endpoint, self.per_second))
            .activate();
    }

    /// Whether `endpoint` is currently throttled.
    pub async fn is_active(&self, endpoint: &str) -> bool {
        let limiters = self.limiters.read().await;
        limiters.get(endpoint).is_some_and(|l| l.is_active())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_rate_limiter_activation() {
        let limiter = EndpointRateLimiter::new("https://rpc.example", 2);
        assert!(!limiter.is_active());

        limiter.activate();
        assert!(limiter.is_active());

        // Second activation should be idempotent
        limiter.activate();
        assert!(limiter.is_active());
    }

    #[tokio::test]
    async fn test_throttle_is_per_endpoint() {
        let throttle = EndpointThrottle::default();
        throttle.activate("https://a.example").await;

        assert!(throttle.is_active("https://a.example").await);
        assert!(!throttle.is_active("https://b.example").await);
    }

    #[tokio::test]
    async fn test_wait_for_unknown_endpoint_returns_immediately() {
        let throttle = EndpointThrottle::default();
        tokio::time::timeout(
            std::time::Duration::from_millis(100),
            throttle.wait_for("https://never-throttled.example"),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_zero_rate_clamps_to_minimum() {
        let throttle = EndpointThrottle::new(0);
        throttle.activate("https://a.example").await;
        // First permit is available immediately
        tokio::time::timeout(
            std::time::Duration::from_millis(100),
            throttle.wait_for("https://a.example"),
        )
        .await
        .unwrap();
    }
}
