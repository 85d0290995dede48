use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::apply::controller::ControllerError;
use crate::ingest::resume::ParseError;
use crate::ingest::scraper::ScrapeError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Resume error: {0}")]
    Parse(#[from] ParseError),

    #[error("Scrape error: {0}")]
    Scrape(#[from] ScrapeError),

    #[error("Auto-apply error: {0}")]
    Controller(#[from] ControllerError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Parse(ParseError::Storage(e)) => {
                tracing::error!("Resume staging error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    "The uploaded document could not be staged".to_string(),
                )
            }
            AppError::Parse(e) => (StatusCode::UNPROCESSABLE_ENTITY, "PARSE_ERROR", e.to_string()),
            AppError::Scrape(ScrapeError::NotConfigured) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SCRAPE_NOT_CONFIGURED",
                ScrapeError::NotConfigured.to_string(),
            ),
            AppError::Scrape(e) => {
                tracing::warn!("Scrape error: {e}");
                (StatusCode::BAD_GATEWAY, "SCRAPE_ERROR", e.to_string())
            }
            AppError::Controller(ControllerError::AlreadyRunning) => (
                StatusCode::CONFLICT,
                "RUN_IN_PROGRESS",
                ControllerError::AlreadyRunning.to_string(),
            ),
            AppError::Controller(ControllerError::WorkerGone) => {
                tracing::error!("Auto-apply worker is gone");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "WORKER_UNAVAILABLE",
                    ControllerError::WorkerGone.to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AppError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (AppError::Parse(ParseError::Empty), StatusCode::UNPROCESSABLE_ENTITY),
            (AppError::Scrape(ScrapeError::Auth(401)), StatusCode::BAD_GATEWAY),
            (AppError::Scrape(ScrapeError::NotConfigured), StatusCode::SERVICE_UNAVAILABLE),
            (AppError::Controller(ControllerError::AlreadyRunning), StatusCode::CONFLICT),
            (AppError::NotFound("resume".into()), StatusCode::NOT_FOUND),
        ];
        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }
}
