//! Retry policy: deadlines, retry counts, and backoff math.

use std::time::Duration;

use reqwest::{Method, StatusCode};

/// Per-attempt deadline applied to every outbound call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Retries after the initial attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Base delay for exponential backoff between attempts.
pub const DEFAULT_RETRY_BASE: Duration = Duration::from_millis(500);

/// Upstream statuses that indicate a transient server-side failure.
///
/// Anything else - including other 5xx statuses - is returned to the caller
/// immediately: a 500 usually reproduces on retry, while 502/503/504 are the
/// load-balancer shapes of "try again shortly".
const RETRYABLE_STATUSES: [StatusCode; 3] = [
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

/// Resilience parameters for one logical outbound call.
///
/// # Defaults
///
/// 10 s per-attempt deadline, 2 retries, 500 ms backoff base, and the
/// conventional idempotent method set (GET, HEAD, OPTIONS, PUT, DELETE).
/// With defaults, a fully failing idempotent call spends 500 ms + 1000 ms
/// sleeping across its three attempts.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Deadline for each individual attempt.
    pub timeout: Duration,
    /// Retries after the first attempt (total attempts = `max_retries + 1`).
    pub max_retries: u32,
    /// Base delay; attempt `i`'s failure is followed by `retry_base * 2^i`.
    pub retry_base: Duration,
    /// Methods eligible for retry on a transient upstream status.
    pub idempotent_methods: Vec<Method>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base: DEFAULT_RETRY_BASE,
            idempotent_methods: vec![
                Method::GET,
                Method::HEAD,
                Method::OPTIONS,
                Method::PUT,
                Method::DELETE,
            ],
        }
    }
}

impl RetryPolicy {
    /// Build a policy with explicit timing parameters and the default
    /// idempotent method set.
    pub fn new(timeout: Duration, max_retries: u32, retry_base: Duration) -> Self {
        Self {
            timeout,
            max_retries,
            retry_base,
            ..Self::default()
        }
    }

    /// Override the per-attempt deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the retry count.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Whether `method` may be retried on a transient upstream status.
    pub fn is_idempotent(&self, method: &Method) -> bool {
        self.idempotent_methods.contains(method)
    }

    /// Whether `status` indicates a transient server-side failure.
    pub fn is_retryable_status(status: StatusCode) -> bool {
        RETRYABLE_STATUSES.contains(&status)
    }

    /// Backoff delay following failed attempt `attempt` (0-based).
    ///
    /// Pure exponential, no jitter: `retry_base * 2^attempt`. Saturates
    /// rather than overflowing for absurd attempt counts.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        match 2u32.checked_pow(attempt) {
            Some(multiplier) => self.retry_base.saturating_mul(multiplier),
            None => Duration::MAX,
        }
    }
}
