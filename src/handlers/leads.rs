//! Lead capture handler.

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde_json::json;
use tracing::instrument;

use crate::error::AppResult;
use crate::logging::RequestLogger;
use crate::models::{LeadRequest, LeadResponse};
use crate::state::AppState;

/// Accept a contact-form lead and hand it to the CRM.
///
/// Validation failures return 400 with a specific, actionable message. A
/// CRM failure does NOT: the visitor always sees `success: true`, and the
/// failure is logged server-side with full detail under the request's
/// correlation ID. A marketing lead form must never expose integration
/// trouble to a prospective buyer; the cost is a silent-loss risk while the
/// CRM is down, which is accepted for this form and revisited if volume
/// ever makes it material.
#[instrument(skip(state, logger, payload), fields(form_type = %payload.form_type))]
pub async fn submit_lead(
    State(state): State<AppState>,
    Extension(logger): Extension<RequestLogger>,
    Json(payload): Json<LeadRequest>,
) -> AppResult<(StatusCode, Json<LeadResponse>)> {
    payload.validate()?;

    let person_id = match state.crm.submit_lead(&payload).await {
        Ok(person_id) => {
            logger.info(
                "lead submitted to CRM",
                Some(json!({
                    "form_type": payload.form_type,
                    "person_id": person_id,
                })),
            );
            person_id
        }
        Err(e) => {
            logger.error(
                "CRM lead submission failed, reporting success to caller",
                Some(json!({
                    "error": e.to_string(),
                    "form_type": payload.form_type,
                    "community_slug": payload.community_slug,
                })),
            );
            None
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(LeadResponse {
            success: true,
            person_id,
        }),
    ))
}
