//! Per-key rate limiting using a token bucket with continuous refill.
//!
//! # Algorithm
//!
//! Each key (client IP) owns a bucket holding up to `limit` tokens. Tokens
//! refill lazily on every check, proportional to the wall-clock time elapsed
//! since the bucket was last touched, at a rate of `limit / window` tokens
//! per unit time. A check consumes one token when at least one is available.
//!
//! # Pruning
//!
//! Buckets for idle keys are swept opportunistically: before servicing a
//! check, if more than `window x 5` has passed since the previous sweep,
//! every bucket idle longer than `window x 2` is dropped. This bounds memory
//! without a background task.
//!
//! # Scope
//!
//! State is per-process. Under horizontal scaling each instance enforces its
//! own budget independently, so the effective global limit is `limit x
//! instances`. That is acceptable for burst protection on short-lived
//! instances; it is not an exact global quota. Introducing a shared store
//! would change this contract and is deliberately out of scope.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Error type for rate limiter configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitError {
    /// Limit cannot be zero; leave the limiter out of the stack instead.
    ZeroLimit,
}

impl fmt::Display for RateLimitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateLimitError::ZeroLimit => {
                write!(f, "limit must be greater than 0; omit the limiter for no limiting")
            }
        }
    }
}

impl std::error::Error for RateLimitError {}

/// Outcome of a rate limit check.
///
/// A denial is a normal result, not an error: callers translate it into a
/// throttling response (the middleware returns 429 with `Retry-After`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the request may proceed (one token was consumed).
    pub allowed: bool,
    /// Whole tokens left after this check (0 when denied).
    pub remaining: u32,
    /// When the bucket would be full again, computed after refill and
    /// before consumption.
    pub reset_at: Instant,
    /// The configured bucket capacity, echoed for response headers.
    pub limit: u32,
}

impl RateLimitDecision {
    /// Seconds until the bucket is full again, measured from `now`.
    /// Clamped to at least 1 for use as a `Retry-After` header value.
    pub fn retry_after_secs(&self, now: Instant) -> u64 {
        self.reset_at.saturating_duration_since(now).as_secs().max(1)
    }
}

/// Per-key token bucket state.
#[derive(Debug, Clone, Copy)]
struct Bucket {
    /// Fractional token count, always within `0.0..=limit`.
    tokens: f64,
    /// Last time this bucket was refilled (i.e. last check for this key).
    last_refill: Instant,
}

/// Map of buckets plus the sweep timestamp, guarded by one mutex.
#[derive(Debug)]
struct BucketTable {
    buckets: HashMap<String, Bucket>,
    last_prune: Instant,
}

/// Token-bucket rate limiter keyed by an opaque string (client IP).
///
/// The tokio runtime is multi-threaded, so the bucket table sits behind a
/// `std::sync::Mutex`; every critical section is a handful of float ops, so
/// an async-aware lock would buy nothing.
#[derive(Debug)]
pub struct RateLimiter {
    limit: u32,
    window: Duration,
    table: Mutex<BucketTable>,
}

impl RateLimiter {
    /// Create a limiter allowing `limit` requests per `window` per key.
    ///
    /// # Errors
    ///
    /// Returns `RateLimitError::ZeroLimit` if `limit` is 0.
    pub fn new(limit: u32, window: Duration) -> Result<Self, RateLimitError> {
        if limit == 0 {
            return Err(RateLimitError::ZeroLimit);
        }

        Ok(Self {
            limit,
            window,
            table: Mutex::new(BucketTable {
                buckets: HashMap::new(),
                last_prune: Instant::now(),
            }),
        })
    }

    /// Create a limiter with the conventional 60-second window.
    pub fn per_minute(limit: u32) -> Result<Self, RateLimitError> {
        Self::new(limit, Duration::from_secs(60))
    }

    /// The configured bucket capacity.
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Check the bucket for `key`, consuming one token if available.
    pub fn check(&self, key: &str) -> RateLimitDecision {
        self.check_at(key, Instant::now())
    }

    /// Check the bucket for `key` at an explicit point in time.
    ///
    /// This is the deterministic entry point: production code goes through
    /// [`check`](Self::check), tests drive the clock directly.
    pub fn check_at(&self, key: &str, now: Instant) -> RateLimitDecision {
        let mut table = match self.table.lock() {
            Ok(guard) => guard,
            // A poisoned mutex means a panic mid-check; the bucket math is
            // still internally consistent, so keep serving.
            Err(poisoned) => poisoned.into_inner(),
        };

        self.maybe_prune(&mut table, now);

        let limit = f64::from(self.limit);
        // Refill rate in tokens per millisecond.
        let rate = limit / duration_millis(self.window);

        let bucket = table
            .buckets
            .entry(key.to_string())
            .or_insert_with(|| Bucket {
                tokens: limit,
                last_refill: now,
            });

        // Lazy refill proportional to elapsed wall-clock time.
        let elapsed_ms = duration_millis(now.saturating_duration_since(bucket.last_refill));
        bucket.tokens = limit.min(bucket.tokens + elapsed_ms * rate);
        bucket.last_refill = now;

        // Time until full, computed post-refill and before consumption.
        let refill_ms = ((limit - bucket.tokens) / rate).ceil().max(0.0) as u64;
        let reset_at = now + Duration::from_millis(refill_ms);

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            RateLimitDecision {
                allowed: true,
                remaining: bucket.tokens.floor() as u32,
                reset_at,
                limit: self.limit,
            }
        } else {
            RateLimitDecision {
                allowed: false,
                remaining: 0,
                reset_at,
                limit: self.limit,
            }
        }
    }

    /// Number of live buckets. Exposed for tests and diagnostics.
    pub fn bucket_count(&self) -> usize {
        match self.table.lock() {
            Ok(guard) => guard.buckets.len(),
            Err(poisoned) => poisoned.into_inner().buckets.len(),
        }
    }

    /// Sweep idle buckets if the prune interval has elapsed.
    fn maybe_prune(&self, table: &mut BucketTable, now: Instant) {
        let prune_interval = self.window * 5;
        if now.saturating_duration_since(table.last_prune) <= prune_interval {
            return;
        }

        let idle_cutoff = self.window * 2;
        table
            .buckets
            .retain(|_, bucket| now.saturating_duration_since(bucket.last_refill) <= idle_cutoff);
        table.last_prune = now;
    }
}

/// Duration as fractional milliseconds.
fn duration_millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}
