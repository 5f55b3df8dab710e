//! Per-IP rate limiting middleware.
//!
//! Each route group gets its own [`RateLimitLayer`] wrapping a shared
//! [`RateLimiter`] instance from application state, so the natural-language
//! search, lead capture, listing search, and community endpoints each
//! enforce their own budget. The limiter itself lives in `crate::ratelimit`;
//! this layer only extracts the client IP, asks for a decision, and turns a
//! denial into a 429.
//!
//! # Response Headers
//!
//! On rate limit exceeded (429):
//! - `Retry-After`: seconds until the bucket refills
//! - `X-RateLimit-Limit`: configured bucket capacity
//! - `X-RateLimit-Remaining`: whole tokens left (always 0 on denial)

use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::response::IntoResponse;
use tower::{Layer, Service};
use tracing::warn;

use crate::ratelimit::RateLimiter;

use super::ip::extract_client_ip;

/// Rate limiting layer for the Tower middleware stack.
///
/// # Example
///
/// ```rust,ignore
/// let limiter = Arc::new(RateLimiter::per_minute(60)?);
/// let router = Router::new()
///     .route("/api/listings/search", post(handler))
///     .route_layer(RateLimitLayer::new(limiter));
/// ```
#[derive(Clone)]
pub struct RateLimitLayer {
    limiter: Arc<RateLimiter>,
}

impl RateLimitLayer {
    /// Create a layer enforcing the given shared limiter.
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self { limiter }
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            limiter: self.limiter.clone(),
        }
    }
}

/// Rate limiting service wrapper.
#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    limiter: Arc<RateLimiter>,
}

impl<S> Service<Request<Body>> for RateLimitService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let limiter = self.limiter.clone();
        let mut inner = self.inner.clone();

        // Extract the key before moving req into the async block.
        let client_ip = extract_client_ip(&req).into_owned();

        Box::pin(async move {
            let now = Instant::now();
            let decision = limiter.check_at(&client_ip, now);

            if decision.allowed {
                return inner.call(req).await;
            }

            let retry_after = decision.retry_after_secs(now);
            let path = req.uri().path();

            warn!(
                client_ip = %client_ip,
                path = %path,
                retry_after_secs = retry_after,
                "Rate limit exceeded for IP"
            );

            let response = (
                StatusCode::TOO_MANY_REQUESTS,
                [
                    ("Retry-After", retry_after.to_string()),
                    ("X-RateLimit-Limit", decision.limit.to_string()),
                    ("X-RateLimit-Remaining", decision.remaining.to_string()),
                ],
                "Rate limit exceeded. Please retry later.",
            )
                .into_response();

            Ok(response)
        })
    }
}
