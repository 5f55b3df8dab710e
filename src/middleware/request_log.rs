//! Request logging middleware: one correlation ID per request.
//!
//! For every inbound request the layer:
//!
//! 1. Creates a [`RequestLogger`] bound to a fresh `req_...` ID and the
//!    request's method and path
//! 2. Stores it in request extensions so handlers emit entries under the
//!    same correlation ID (and can attach the ID to upstream errors)
//! 3. Adds `X-Request-Id` to the response
//! 4. Emits the terminal `done` entry with the total duration and status
//!
//! # Client Usage
//!
//! The response header lets a client quote the ID in support requests:
//!
//! ```bash
//! curl -i http://localhost:3000/api/communities | grep -i x-request-id
//! ```

use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::header::HeaderValue;
use axum::http::{Request, Response};
use serde_json::json;
use tower::{Layer, Service};

use crate::logging::RequestLogger;

/// Header name for the correlation ID on responses.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Fallback header value if an ID ever fails to parse as a header.
/// Generated IDs are always valid ASCII, so this is belt and suspenders.
static UNKNOWN_REQUEST_ID: HeaderValue = HeaderValue::from_static("unknown");

/// Request logging layer for the Tower middleware stack.
#[derive(Clone, Default)]
pub struct RequestLogLayer;

impl RequestLogLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for RequestLogLayer {
    type Service = RequestLogService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestLogService { inner }
    }
}

/// Request logging service wrapper.
#[derive(Clone)]
pub struct RequestLogService<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for RequestLogService<S>
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

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let logger = RequestLogger::new(req.method().as_str(), req.uri().path());
        let request_id = logger.request_id().to_string();

        // Handlers pull the logger back out via `Extension<RequestLogger>`.
        req.extensions_mut().insert(logger.clone());

        let mut inner = self.inner.clone();

        Box::pin(async move {
            let mut response = inner.call(req).await?;

            response.headers_mut().insert(
                REQUEST_ID_HEADER,
                HeaderValue::from_str(&request_id)
                    .unwrap_or_else(|_| UNKNOWN_REQUEST_ID.clone()),
            );

            logger.done(
                "request completed",
                Some(json!({ "status": response.status().as_u16() })),
            );

            Ok(response)
        })
    }
}

/// Extension trait to read the correlation ID off a request.
pub trait RequestIdExt {
    /// The correlation ID assigned by the request-log middleware, if any.
    fn request_id(&self) -> Option<&str>;
}

impl<B> RequestIdExt for Request<B> {
    fn request_id(&self) -> Option<&str> {
        self.extensions()
            .get::<RequestLogger>()
            .map(|logger| logger.request_id())
    }
}
