//! Application routing configuration with middleware stack.
//!
//! # Middleware Stack
//!
//! ```text
//! Request
//!    │
//!    ▼
//! ┌──────────────────┐
//! │   Request Log    │ ← assigns req_... ID, X-Request-Id header, done() line
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │     Tracing      │ ← HTTP request/response spans
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │      CORS        │ ← Cross-origin headers
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │  Rate Limiting   │ ← per route group, 429 if exceeded
//! └────────┬─────────┘
//!          │
//!          ▼
//!      Handler
//! ```
//!
//! Rate limiting is a route-group layer so each call-site role (NLP search,
//! leads, listing search, communities) enforces its own budget; the
//! request-log layer wraps everything so even throttled requests get a
//! correlation ID and a terminal log line.

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::handlers;
use crate::middleware::{RateLimitLayer, RequestLogLayer};
use crate::ratelimit::RateLimiter;
use crate::state::AppState;

/// Build the application router with all routes and middleware configured.
pub fn build_router(state: AppState) -> Router {
    let config = &state.config;

    let cors = build_cors_layer(&config.cors_allowed_origins);

    // =========================================================================
    // Route groups, each bound to its role's limiter
    // =========================================================================
    let listing_search = limited(
        Router::new().route("/api/listings/search", post(handlers::search_listings)),
        &state.limits.listing_search,
        "listing search",
    );

    let nlp_search = limited(
        Router::new().route("/api/search/nlp", post(handlers::nlp_search)),
        &state.limits.nlp_search,
        "NLP search",
    );

    let leads = limited(
        Router::new().route("/api/leads", post(handlers::submit_lead)),
        &state.limits.leads,
        "lead submission",
    );

    let communities = limited(
        Router::new()
            .route("/api/communities", get(handlers::list_communities))
            .route(
                "/api/communities/{slug}/nearby",
                get(handlers::nearby_communities),
            ),
        &state.limits.community_listing,
        "community listing",
    );

    let mut router = Router::new()
        // Health endpoints are never rate limited
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .merge(listing_search)
        .merge(nlp_search)
        .merge(leads)
        .merge(communities);

    // =========================================================================
    // Apply Middleware Stack (order matters - applied bottom to top)
    // =========================================================================

    // 1. Request body size limit (prevents DoS via large payloads)
    router = router.layer(DefaultBodyLimit::max(config.max_request_body_size));

    // 2. CORS
    router = router.layer(cors);

    // 3. Tracing
    router = router.layer(TraceLayer::new_for_http());

    // 4. Request log (outermost: every request gets an ID and a done line)
    router = router.layer(RequestLogLayer::new());

    router.with_state(state)
}

/// Attach a role's rate limiter to a route group, if the role has one.
fn limited(
    router: Router<AppState>,
    limiter: &Option<Arc<RateLimiter>>,
    role: &str,
) -> Router<AppState> {
    match limiter {
        Some(limiter) => {
            info!(
                role,
                limit = limiter.limit(),
                "Rate limiting enabled for route group"
            );
            router.route_layer(RateLimitLayer::new(limiter.clone()))
        }
        None => {
            info!(role, "Rate limiting disabled for route group");
            router
        }
    }
}

/// Build CORS layer from configuration.
///
/// # Security Note
///
/// Using `*` (any origin) is convenient for development but should be
/// avoided in production. Specify explicit origins instead.
fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let allow_any = allowed_origins.iter().any(|o| o == "*");

    if allow_any {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
