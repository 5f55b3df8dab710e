//! Listing search handlers.
//!
//! # Endpoints
//!
//! - `POST /api/listings/search` - filtered search proxied to the MLS
//!   provider
//! - `POST /api/search/nlp` - natural-language search: the prompt is run
//!   through the injection guard before it leaves this service, and the
//!   provider's summary is sanitized before it comes back

use axum::extract::State;
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::error::{AppError, AppResult};
use crate::logging::RequestLogger;
use crate::models::{NlpSearchResponse, SearchFilters, SearchResponse};
use crate::state::AppState;
use crate::validation::{sanitize_nlp_summary, validate_nlp_prompt};

/// Run a filtered listing search against the MLS provider.
///
/// # Request Body
///
/// ```json
/// {
///   "min_price": 300000,
///   "max_price": 550000,
///   "beds_min": 3,
///   "page": 1,
///   "page_size": 20,
///   "sort": "newest"
/// }
/// ```
///
/// Pagination is clamped server-side (`page >= 1`, `page_size <=
/// PAGE_SIZE_CAP`). Upstream failures surface as a generic error carrying
/// the request's correlation ID.
#[instrument(skip(state, logger, filters), fields(page = filters.page))]
pub async fn search_listings(
    State(state): State<AppState>,
    Extension(logger): Extension<RequestLogger>,
    Json(filters): Json<SearchFilters>,
) -> AppResult<Json<SearchResponse>> {
    let filters = filters.clamp_pagination(state.config.page_size_cap);

    let result = state.mls.search(&filters).await.map_err(|e| {
        logger.error("MLS search failed", Some(json!({ "error": e.to_string() })));
        e.with_request_id(logger.request_id())
    })?;

    logger.info(
        "listing search completed",
        Some(json!({
            "returned": result.listings.len(),
            "total": result.total,
            "page": filters.page,
        })),
    );

    Ok(Json(SearchResponse::paged(
        result.listings,
        result.total,
        filters.page,
        filters.page_size,
    )))
}

/// Request body for natural-language search.
#[derive(Debug, Deserialize)]
pub struct NlpSearchRequest {
    /// Free-text query, e.g. "3 bed house in Austin under $500k"
    pub query: String,
}

/// Run a natural-language listing search.
///
/// The query passes the prompt guard first; a rejection returns 400 with a
/// machine-readable code and a redirect message that never echoes the
/// offending input. The provider's summary text is treated as untrusted and
/// sanitized before it is returned.
#[instrument(skip(state, logger, payload))]
pub async fn nlp_search(
    State(state): State<AppState>,
    Extension(logger): Extension<RequestLogger>,
    Json(payload): Json<NlpSearchRequest>,
) -> AppResult<Json<NlpSearchResponse>> {
    let prompt = validate_nlp_prompt(&payload.query).map_err(|rejection| {
        logger.warn(
            "NLP prompt rejected",
            Some(json!({ "code": rejection.code.as_str() })),
        );
        AppError::PromptRejected(rejection)
    })?;

    let result = state.mls.nlp_search(&prompt).await.map_err(|e| {
        logger.error("NLP search failed", Some(json!({ "error": e.to_string() })));
        e.with_request_id(logger.request_id())
    })?;

    let summary = result.summary.as_deref().map(sanitize_nlp_summary);

    logger.info(
        "NLP search completed",
        Some(json!({
            "returned": result.listings.len(),
            "total": result.total,
        })),
    );

    // NLP results come back as a single page sized by the provider.
    let page_size = (result.listings.len() as u32).max(1);
    Ok(Json(NlpSearchResponse {
        results: SearchResponse::paged(result.listings, result.total, 1, page_size),
        summary,
    }))
}
