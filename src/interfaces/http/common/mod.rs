//! Response envelope, error mapping and extractors shared by every module

pub mod validated_json;

use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

use crate::domain::DomainError;

pub use validated_json::{ValidatedJson, ValidatedJsonRejection};

/// Standard API envelope.
///
/// Success: `{"success": true, "data": {...}}`,
/// failure: `{"success": false, "error": "..."}`. Contention failures also
/// carry `"retryable": true`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Set when repeating the same request may succeed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            retryable: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            retryable: None,
        }
    }

    pub fn retryable_error(message: impl Into<String>) -> Self {
        Self {
            retryable: Some(true),
            ..Self::error(message)
        }
    }
}

/// Error half of every handler result.
pub type ApiError = (StatusCode, Json<ApiResponse<()>>);

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// Map a domain failure onto a status code and envelope.
///
/// Storage and other internal failures are logged here and answered with
/// a generic message.
pub fn domain_error(e: DomainError) -> ApiError {
    let (status, body) = match &e {
        DomainError::Validation(_) => (StatusCode::BAD_REQUEST, ApiResponse::error(e.to_string())),
        DomainError::NotFound { .. } => (StatusCode::NOT_FOUND, ApiResponse::error(e.to_string())),
        DomainError::RoomNotAvailable { .. } | DomainError::Conflict(_) => {
            (StatusCode::CONFLICT, ApiResponse::error(e.to_string()))
        }
        DomainError::ConcurrentBookingConflict(_) | DomainError::VersionConflict(_) => (
            StatusCode::CONFLICT,
            ApiResponse::retryable_error("Booking is contended, please retry"),
        ),
        DomainError::InvalidStateTransition { .. } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            ApiResponse::error(e.to_string()),
        ),
        DomainError::UpstreamUnavailable(_) => {
            error!(error = %e, "Upstream dependency failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                ApiResponse::retryable_error("A dependency is temporarily unavailable"),
            )
        }
        DomainError::Storage(_) => {
            error!(error = %e, "Request failed with an internal error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiResponse::error("Internal server error"),
            )
        }
    };
    (status, Json(body))
}
