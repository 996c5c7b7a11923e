//! Outbound request rate limiting around governor.
//!
//! Every enrichment request waits on one shared limiter so a burst of qualifying
//! launches cannot exceed the indexer quota.

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, instrument};

/// Shared per-process limiter for RPC calls.
pub struct RpcRateLimiter {
    limiter: DefaultDirectRateLimiter,
    requests_per_second: u32,
    granted: AtomicU64,
    delayed: AtomicU64,
}

impl RpcRateLimiter {
    pub fn new(requests_per_second: u32) -> Self {
        let per_second = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        Self {
            limiter: RateLimiter::direct(Quota::per_second(per_second)),
            requests_per_second: per_second.get(),
            granted: AtomicU64::new(0),
            delayed: AtomicU64::new(0),
        }
    }

    /// Wait until a request may be sent.
    #[instrument(skip(self))]
    pub async fn acquire(&self) {
        if self.limiter.check().is_err() {
            self.delayed.fetch_add(1, Ordering::Relaxed);
            debug!("RPC rate limit reached, waiting for a permit");
            self.limiter.until_ready().await;
        }
        self.granted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> RateLimitStats {
        RateLimitStats {
            requests_per_second: self.requests_per_second,
            granted: self.granted.load(Ordering::Relaxed),
            delayed: self.delayed.load(Ordering::Relaxed),
        }
    }
}

/// Rate limiting statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitStats {
    pub requests_per_second: u32,
    pub granted: u64,
    pub delayed: u64,
}
