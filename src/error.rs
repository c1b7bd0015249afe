// =============================================================================
// ERROR MODULE
// =============================================================================
// Service error type and its HTTP mapping.
//
// The classifiers are total and never produce errors; everything here comes
// from the store or a malformed request. Cache failures are logged and
// bypassed, never returned.
// =============================================================================

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

#[derive(Debug, Error)]
pub enum AppError {
    /// Database query failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Product, batch or notification does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request data (unknown stage, bad id...)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),

            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),

            // Don't expose internal details
            AppError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                "A database error occurred".to_string(),
            ),

            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg.clone(),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = self.parts();

        tracing::error!(
            error_code = error_code,
            message = %message,
            cause = %self,
            "Request failed"
        );

        let body = ErrorResponse::new(error_code, message);

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        // The db layer wraps sqlx errors with context; keep them classified
        // as database failures.
        match err.downcast::<sqlx::Error>() {
            Ok(db_err) => AppError::Database(db_err),
            Err(err) => AppError::Internal(format!("{:#}", err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::NotFound("x".into()).parts().0, StatusCode::NOT_FOUND);
        assert_eq!(AppError::BadRequest("x".into()).parts().0, StatusCode::BAD_REQUEST);

        let (status, code, message) = AppError::Internal("boom".into()).parts();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(code, "INTERNAL_ERROR");
        assert_eq!(message, "boom");
    }

    #[test]
    fn test_anyhow_sqlx_error_maps_to_database() {
        let err = anyhow::Error::new(sqlx::Error::RowNotFound).context("Failed to fetch product");
        assert!(matches!(AppError::from(err), AppError::Database(_)));

        let err = anyhow::anyhow!("boom");
        assert!(matches!(AppError::from(err), AppError::Internal(_)));
    }
}
