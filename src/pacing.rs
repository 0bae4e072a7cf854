//! Request pacing between search pages
//!
//! The [`Fetcher`](crate::fetcher::Fetcher) calls [`PacingPolicy::pace`] once
//! between consecutive search requests. Policies decide how long that pause
//! lasts without touching the pagination loop itself.

use crate::config::PacingConfig;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Delay applied between consecutive requests
#[async_trait]
pub trait PacingPolicy: Send + Sync {
    /// Wait until the next request may be issued
    async fn pace(&self);
}

/// Sleep a fixed interval between requests
///
/// Does not adapt to server feedback: no rate-limit headers are read and
/// there is no backoff or jitter.
#[derive(Clone, Copy, Debug)]
pub struct FixedDelay(pub Duration);

impl Default for FixedDelay {
    fn default() -> Self {
        Self(Duration::from_secs(1))
    }
}

#[async_trait]
impl PacingPolicy for FixedDelay {
    async fn pace(&self) {
        if !self.0.is_zero() {
            tokio::time::sleep(self.0).await;
        }
    }
}

/// Issue requests back to back
#[derive(Clone, Copy, Debug, Default)]
pub struct NoDelay;

#[async_trait]
impl PacingPolicy for NoDelay {
    async fn pace(&self) {}
}

/// Token bucket limiting requests per second
///
/// # Algorithm
///
/// - One token is one request
/// - Tokens refill at `requests_per_second` and the bucket holds at most
///   one second's worth, so short bursts up to that size pass unthrottled
/// - [`pace`](PacingPolicy::pace) takes one token, waiting for a refill when
///   the bucket is empty
///
/// Clones share the same bucket.
#[derive(Clone, Debug)]
pub struct RequestRateLimiter {
    /// Sustained request rate
    rate: u64,
    /// Requests that may be issued right now
    tokens: Arc<AtomicU64>,
    /// Last refill timestamp (nanoseconds since arbitrary epoch)
    last_refill: Arc<AtomicU64>,
}

impl RequestRateLimiter {
    /// Create a limiter allowing `requests_per_second` on average
    ///
    /// A rate of 0 is treated as 1.
    ///
    /// # Examples
    ///
    /// ```
    /// use guild_search_dl::pacing::RequestRateLimiter;
    ///
    /// let limiter = RequestRateLimiter::new(2);
    /// assert_eq!(limiter.rate(), 2);
    /// ```
    #[must_use]
    pub fn new(requests_per_second: u64) -> Self {
        let rate = requests_per_second.max(1);
        Self {
            rate,
            tokens: Arc::new(AtomicU64::new(rate)),
            last_refill: Arc::new(AtomicU64::new(Self::now_nanos())),
        }
    }

    /// Requests per second this limiter allows
    pub fn rate(&self) -> u64 {
        self.rate
    }

    /// Take one token, waiting for a refill if the bucket is empty
    pub async fn acquire(&self) {
        loop {
            self.refill_tokens();

            let current = self.tokens.load(Ordering::SeqCst);
            if current > 0 {
                if self
                    .tokens
                    .compare_exchange(current, current - 1, Ordering::SeqCst, Ordering::SeqCst)
                    .is_ok()
                {
                    return;
                }
                // Lost the race to another clone, retry immediately
                continue;
            }

            // Time until one token accrues, capped so refills are noticed promptly
            let wait_ms = 1000 / self.rate;
            tokio::time::sleep(Duration::from_millis(wait_ms.clamp(10, 100))).await;
        }
    }

    /// Refill tokens based on elapsed time since last refill
    fn refill_tokens(&self) {
        let now = Self::now_nanos();
        let last = self.last_refill.load(Ordering::SeqCst);

        let elapsed_secs = now.saturating_sub(last) as f64 / 1_000_000_000.0;
        let tokens_to_add = (self.rate as f64 * elapsed_secs) as u64;

        if tokens_to_add > 0
            && self
                .last_refill
                .compare_exchange(last, now, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
        {
            let current = self.tokens.load(Ordering::SeqCst);
            let refilled = (current + tokens_to_add).min(self.rate);
            self.tokens.store(refilled, Ordering::SeqCst);
        }
    }

    /// Monotonic time in nanoseconds since the first call in this process
    fn now_nanos() -> u64 {
        static START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();
        let start = START.get_or_init(Instant::now);
        start.elapsed().as_nanos() as u64
    }
}

#[async_trait]
impl PacingPolicy for RequestRateLimiter {
    async fn pace(&self) {
        self.acquire().await;
    }
}

/// Build the policy a [`PacingConfig`] describes
pub fn from_config(config: &PacingConfig) -> Box<dyn PacingPolicy> {
    match config {
        PacingConfig::Fixed { delay_ms } => Box::new(FixedDelay(Duration::from_millis(*delay_ms))),
        PacingConfig::None => Box::new(NoDelay),
        PacingConfig::RateLimited {
            requests_per_second,
        } => Box::new(RequestRateLimiter::new(*requests_per_second)),
    }
}
