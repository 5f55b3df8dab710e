//! Community catalog handlers.
//!
//! # Endpoints
//!
//! - `GET /api/communities` - distinct catalog entries
//! - `GET /api/communities/{slug}/nearby` - communities ranked by centroid
//!   distance, nearest first

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use tracing::instrument;

use crate::error::{AppError, AppResult};
use crate::geo::DEFAULT_NEARBY_LIMIT;
use crate::models::{CommunitySummary, NearbyCommunity};
use crate::state::AppState;

/// Upper bound on the `limit` query parameter.
const MAX_NEARBY_LIMIT: usize = 25;

/// List every distinct community in the catalog.
#[instrument(skip(state))]
pub async fn list_communities(State(state): State<AppState>) -> Json<Vec<CommunitySummary>> {
    Json(state.catalog.summaries())
}

/// Query parameters for the nearby ranking.
#[derive(Debug, Deserialize)]
pub struct NearbyQuery {
    /// Maximum number of results (default: 5, capped at 25)
    #[serde(default = "default_nearby_limit")]
    pub limit: usize,
}

fn default_nearby_limit() -> usize {
    DEFAULT_NEARBY_LIMIT
}

/// Rank communities by proximity to the one in the path.
///
/// Returns 404 for an unknown slug. Cross-metro candidates are filtered by
/// the catalog's regional-county rule.
///
/// # Example
///
/// ```bash
/// curl "http://localhost:3000/api/communities/mueller/nearby?limit=3"
/// ```
#[instrument(skip(state))]
pub async fn nearby_communities(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<NearbyQuery>,
) -> AppResult<Json<Vec<NearbyCommunity>>> {
    if state.catalog.get(&slug).is_none() {
        return Err(AppError::NotFound(format!("Unknown community '{slug}'")));
    }

    let limit = query.limit.clamp(1, MAX_NEARBY_LIMIT);
    Ok(Json(state.catalog.nearby(&slug, limit)))
}
