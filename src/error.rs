use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::validation::PromptRejection;

/// Application-wide error types with appropriate HTTP status codes.
///
/// # Upstream Errors
///
/// Errors from the MLS search provider and the CRM are deliberately generic
/// on the wire: clients see "Failed to fetch listings" plus the request ID,
/// while the full upstream detail is logged server-side. The request ID lets
/// an operator reconstruct the trace from the logs.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Upstream request failed: {detail}")]
    Upstream {
        detail: String,
        /// Correlation ID of the request that triggered the upstream call.
        request_id: Option<String>,
    },

    #[error("Upstream request timed out: {0}")]
    UpstreamTimeout(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("{}", .0.message)]
    PromptRejected(PromptRejection),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl AppError {
    /// Attach a correlation ID to an upstream error so the generic client
    /// message still gives operators a handle into the logs. Other variants
    /// pass through unchanged.
    pub fn with_request_id(self, request_id: &str) -> Self {
        match self {
            AppError::Upstream { detail, .. } => AppError::Upstream {
                detail,
                request_id: Some(request_id.to_string()),
            },
            other => other,
        }
    }
}

/// Error response body for API endpoints.
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_id: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full error details server-side for debugging
        // but only expose sanitized messages to clients
        tracing::error!(error = %self, "Request failed");

        let (status, error_type, message, request_id) = match &self {
            // Upstream/integration errors - never leak provider details.
            // The request_id gives operators a handle into the logs.
            AppError::Upstream { request_id, .. } => (
                StatusCode::BAD_GATEWAY,
                "upstream_error",
                "Failed to fetch listings. Please try again later.".to_string(),
                request_id.clone(),
            ),
            AppError::UpstreamTimeout(_) => (
                StatusCode::GATEWAY_TIMEOUT,
                "upstream_timeout",
                "The listing service took too long to respond. Please try again.".to_string(),
                None,
            ),

            // Internal errors - never expose internal details to clients
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "An internal error occurred. Please contact support if the issue persists."
                    .to_string(),
                None,
            ),
            AppError::ConfigError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "config_error",
                "Service configuration error. Please contact support.".to_string(),
                None,
            ),

            // Client errors - safe to show the message as it's user-facing
            AppError::SerializationError(e) => {
                let sanitized = sanitize_serde_error(e);
                return (
                    StatusCode::BAD_REQUEST,
                    axum::Json(ErrorResponse {
                        error: "serialization_error".to_string(),
                        message: sanitized,
                        request_id: None,
                    }),
                )
                    .into_response();
            }
            AppError::PromptRejected(rejection) => (
                StatusCode::BAD_REQUEST,
                rejection.code.as_str(),
                rejection.message.to_string(),
                None,
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None)
            }
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
            request_id,
        };

        (status, axum::Json(body)).into_response()
    }
}

/// Sanitize serde error messages to avoid leaking internal type information.
///
/// Serde errors can contain internal struct/field names which shouldn't be
/// exposed to external clients. This function extracts the useful parts.
fn sanitize_serde_error(e: &serde_json::Error) -> String {
    let msg = e.to_string();

    // Common patterns to simplify for users
    if msg.contains("missing field")
        && let Some(start) = msg.find('`')
        && let Some(end) = msg[start + 1..].find('`')
    {
        let field = &msg[start + 1..start + 1 + end];
        return format!("Missing required field: {field}");
    }

    if msg.contains("unknown field")
        && let Some(start) = msg.find('`')
        && let Some(end) = msg[start + 1..].find('`')
    {
        let field = &msg[start + 1..start + 1 + end];
        return format!("Unknown field: {field}");
    }

    if msg.contains("invalid type") {
        return "Invalid data type in request body".to_string();
    }

    if msg.contains("EOF while parsing") || msg.contains("expected") {
        return "Malformed JSON in request body".to_string();
    }

    // Generic fallback that doesn't leak internal details
    "Invalid request format".to_string()
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
