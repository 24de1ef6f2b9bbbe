//! HTTP error mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sentimentscope_store::StoreError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Error returned by handlers and batch passes
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    /// A model the operation depends on was not loaded
    #[error("{0}")]
    ModelUnavailable(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Analysis(#[from] sentimentscope_core::Error),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn phone_not_found() -> Self {
        Self::NotFound("Phone not found".to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Store(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            Self::Store(StoreError::MissingColumn(_) | StoreError::Csv(_)) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::BadRequest(_) => "invalid_request_error",
            Self::ModelUnavailable(_) => "model_unavailable",
            Self::Store(e) if e.is_not_found() => "not_found",
            Self::Store(StoreError::MissingColumn(_) | StoreError::Csv(_)) => "invalid_request_error",
            Self::Store(_) => "database_error",
            Self::Analysis(_) | Self::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }

        let body = json!({
            "error": {
                "message": self.to_string(),
                "type": self.kind(),
            }
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::phone_not_found().status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::BadRequest("Text is required".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::ModelUnavailable("Sentiment model not loaded".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::from(StoreError::NotFound("phone 3".into())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(StoreError::MissingColumn("review_text".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(sentimentscope_core::Error::internal("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
