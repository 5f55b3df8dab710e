//! Resilient outbound HTTP: per-attempt timeouts and method-aware retries.
//!
//! Every call to the MLS search provider and the CRM goes through
//! [`ResilientClient`], which wraps a shared `reqwest::Client` with:
//!
//! - **Per-attempt deadline**: each attempt runs under its own
//!   `tokio::time::timeout`; expiry drops the in-flight future, aborting the
//!   transfer. Every attempt gets a fresh timer, so a slow attempt cannot
//!   bleed into the next one.
//! - **Method-aware retry**: 502/503/504 responses are retried only for
//!   idempotent methods. A POST that hit a 5xx may already have applied its
//!   side effect upstream, so the response is returned as-is and the caller
//!   decides.
//! - **Exponential backoff**: failed attempt `i` is followed by
//!   `retry_base * 2^i` of sleep, never after the final attempt. No jitter:
//!   the retry budget is small and bounded, and deterministic delays keep
//!   the timing testable.
//! - **Transport failures** (timeout, DNS, connection reset) are retried for
//!   every method.
//!
//! Exhausted retries surface the last observed error; this layer never
//! swallows a failure. There is no caching and no shared mutable state.

mod policy;

use std::time::Duration;

use reqwest::{Method, Response, StatusCode};
use thiserror::Error;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

pub use policy::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_BASE, DEFAULT_TIMEOUT, RetryPolicy};

/// Errors surfaced after the retry budget is exhausted (or for failures that
/// are never retried).
#[derive(Error, Debug)]
pub enum FetchError {
    /// An attempt exceeded the per-attempt deadline.
    #[error("request to {method} {url} timed out after {timeout:?}")]
    Timeout {
        method: Method,
        url: String,
        timeout: Duration,
    },

    /// Transport-level failure: DNS, connect, reset, TLS.
    #[error("network error for {method} {url}: {source}")]
    Transport {
        method: Method,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// A retryable upstream status persisted through every attempt.
    #[error("HTTP {} from {method} {url}", status.as_u16())]
    UpstreamStatus {
        status: StatusCode,
        method: Method,
        url: String,
    },

    /// The request could not be built from its parts.
    #[error("failed to build request: {0}")]
    InvalidRequest(#[source] reqwest::Error),

    /// Streaming bodies cannot be replayed across attempts.
    #[error("request body cannot be replayed for retry")]
    BodyNotCloneable,
}

impl FetchError {
    /// Whether this error was a per-attempt timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Timeout { .. })
    }
}

/// HTTP client wrapper applying a [`RetryPolicy`] to every call.
///
/// Cheap to clone: the inner `reqwest::Client` is an `Arc` around its
/// connection pool.
#[derive(Debug, Clone)]
pub struct ResilientClient {
    http: reqwest::Client,
    policy: RetryPolicy,
}

impl ResilientClient {
    /// Create a client with a fresh connection pool and the given policy.
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            http: reqwest::Client::new(),
            policy,
        }
    }

    /// Create a client around an existing `reqwest::Client`.
    pub fn with_http(http: reqwest::Client, policy: RetryPolicy) -> Self {
        Self { http, policy }
    }

    /// The default policy applied by [`execute`](Self::execute).
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Start building a request against the shared connection pool.
    pub fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        self.http.request(method, url)
    }

    /// Build and execute a request under the client's default policy.
    pub async fn execute(&self, builder: reqwest::RequestBuilder) -> Result<Response, FetchError> {
        let request = builder.build().map_err(FetchError::InvalidRequest)?;
        self.execute_with_policy(request, &self.policy).await
    }

    /// Execute a request under an explicit policy.
    ///
    /// Attempts are strictly sequential; there is no concurrent racing of
    /// attempts. Returns the first response that is either successful or
    /// non-retryable (including retryable statuses on non-idempotent
    /// methods, returned as-is). Fails with the last observed error once
    /// the retry budget is spent.
    pub async fn execute_with_policy(
        &self,
        request: reqwest::Request,
        policy: &RetryPolicy,
    ) -> Result<Response, FetchError> {
        let method = request.method().clone();
        let url = request.url().to_string();
        let idempotent = policy.is_idempotent(&method);

        let mut attempt: u32 = 0;
        loop {
            // Each attempt needs its own copy; bodies built from bytes are
            // always cloneable, streaming bodies are not supported here.
            let Some(current) = request.try_clone() else {
                return Err(FetchError::BodyNotCloneable);
            };

            let error = match timeout(policy.timeout, self.http.execute(current)).await {
                Ok(Ok(response)) => {
                    let status = response.status();
                    if !RetryPolicy::is_retryable_status(status) {
                        return Ok(response);
                    }
                    if !idempotent {
                        // Retrying could duplicate a side effect; hand the
                        // response back unchanged.
                        debug!(
                            method = %method,
                            url = %url,
                            status = status.as_u16(),
                            "Transient upstream status on non-idempotent method, not retrying"
                        );
                        return Ok(response);
                    }
                    FetchError::UpstreamStatus {
                        status,
                        method: method.clone(),
                        url: url.clone(),
                    }
                }
                Ok(Err(source)) => FetchError::Transport {
                    method: method.clone(),
                    url: url.clone(),
                    source,
                },
                // Dropping the response future aborts the in-flight call.
                Err(_elapsed) => FetchError::Timeout {
                    method: method.clone(),
                    url: url.clone(),
                    timeout: policy.timeout,
                },
            };

            if attempt >= policy.max_retries {
                warn!(
                    method = %method,
                    url = %url,
                    attempts = attempt + 1,
                    error = %error,
                    "Upstream call failed, retries exhausted"
                );
                return Err(error);
            }

            let delay = policy.backoff_delay(attempt);
            debug!(
                method = %method,
                url = %url,
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Upstream call failed, backing off before retry"
            );
            sleep(delay).await;
            attempt += 1;
        }
    }
}

impl Default for ResilientClient {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}
