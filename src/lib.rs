//! # Crestline API
//!
//! Backend for the Crestline Homes marketing and listing-search website:
//! JSON API routes in front of an MLS search provider and a CRM, with a
//! resilient outbound-call layer between this service and both upstreams.
//!
//! - **Resilience**: per-attempt timeouts and method-aware exponential-backoff
//!   retries on every outbound call
//! - **Abuse protection**: per-IP token-bucket rate limiting per route group,
//!   prompt-injection screening on the natural-language search box
//! - **Observability**: one correlation ID per request threaded through
//!   structured log entries and error responses
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Axum HTTP Server                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Middleware (Request Log → Trace → CORS → Rate Limit)       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Handlers (health, search, leads, communities)              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Services (MlsClient, CrmClient)        Geo (catalog)       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ResilientClient (timeout + backoff over reqwest)           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  MLS search provider / CRM (opaque HTTP services)           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use crestline_api::{AppState, Config, build_router, geo::CommunityCatalog};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let catalog = CommunityCatalog::embedded()?;
//!     let state = AppState::new(config, catalog)?;
//!     let app = build_router(state);
//!
//!     // Start the server...
//!     Ok(())
//! }
//! ```
//!
//! ## Rate Limiting Configuration
//!
//! Per-role budgets, requests per minute per client IP:
//!
//! ```bash
//! RATE_LIMIT_NLP_SEARCH=10 RATE_LIMIT_LEADS=5 \
//! RATE_LIMIT_LISTING_SEARCH=60 RATE_LIMIT_COMMUNITIES=30 cargo run
//! ```

pub mod config;
pub mod error;
pub mod fetch;
pub mod geo;
pub mod handlers;
pub mod logging;
pub mod middleware;
pub mod models;
pub mod ratelimit;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;
pub mod validation;

// Re-exports for convenience
pub use config::Config;
pub use error::{AppError, AppResult};
pub use fetch::{FetchError, ResilientClient, RetryPolicy};
pub use logging::RequestLogger;
pub use ratelimit::{RateLimitDecision, RateLimiter};
pub use routes::build_router;
pub use state::AppState;
