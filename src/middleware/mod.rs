//! HTTP middleware for rate limiting and request observability.
//!
//! # Architecture
//!
//! ```text
//! Request → Rate Limiter → Request Log → Trace → CORS → Handler
//!               ↓               ↓
//!          429 Too Many    X-Request-Id header + done() line
//! ```
//!
//! Rate limiting is applied per route group (each group binds its own
//! shared limiter instance), while the request-log layer wraps the whole
//! router so every request gets exactly one correlation ID.

pub mod ip;
pub mod rate_limit;
pub mod request_log;

pub use ip::{UNKNOWN_IP, extract_client_ip};
pub use rate_limit::RateLimitLayer;
pub use request_log::{REQUEST_ID_HEADER, RequestIdExt, RequestLogLayer};
