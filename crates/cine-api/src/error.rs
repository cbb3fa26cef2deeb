//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Feature extraction error: {0}")]
    Features(#[from] cine_features::FeatureError),

    #[error("Routing error: {0}")]
    Router(#[from] cine_router::RouterError),

    #[error("Cache error: {0}")]
    Cache(#[from] cine_cache::CacheError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] cine_ledger::LedgerError),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Router(cine_router::RouterError::ProviderUnavailable) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::Internal(_)
            | ApiError::Features(_)
            | ApiError::Router(_)
            | ApiError::Cache(_)
            | ApiError::Ledger(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't expose internal error details in production
        let detail = match &self {
            ApiError::NotFound(_) | ApiError::BadRequest(_) => self.to_string(),
            ApiError::Router(cine_router::RouterError::ProviderUnavailable) => self.to_string(),
            _ => {
                if std::env::var("ENVIRONMENT").unwrap_or_default() == "production" {
                    "An internal error occurred".to_string()
                } else {
                    self.to_string()
                }
            }
        };

        let body = ErrorResponse { detail };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_unavailable_maps_to_503() {
        let err = ApiError::from(cine_router::RouterError::ProviderUnavailable);
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_bad_request_maps_to_400() {
        assert_eq!(
            ApiError::bad_request("missing file").status_code(),
            StatusCode::BAD_REQUEST
        );
    }
}
