use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::auth::AuthError;
use crate::resume::extract::ExtractError;
use crate::resume::fields::ParseError;
use crate::resume::ingest::{IngestError, IngestStage};
use crate::resume::store::StoreError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Resume ingestion error: {0}")]
    Ingest(#[from] IngestError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Database(e) => AppError::Database(e),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidToken(_) => AppError::Unauthorized,
            AuthError::Hash(msg) => AppError::Internal(anyhow::anyhow!("password hashing: {msg}")),
            AuthError::Signing(e) => AppError::Internal(anyhow::anyhow!("token signing: {e}")),
        }
    }
}

/// Status, code and client-facing message for a failed ingestion.
/// Server-class failures are logged here and reported without internals.
fn ingest_response(e: &IngestError) -> (StatusCode, &'static str, String) {
    let stage = e.stage();
    match e {
        IngestError::UnsupportedFormat(_) => {
            (StatusCode::BAD_REQUEST, "UNSUPPORTED_FORMAT", e.to_string())
        }
        IngestError::Extraction(ExtractError::UnsupportedFormat(_)) => {
            (StatusCode::BAD_REQUEST, "UNSUPPORTED_FORMAT", e.to_string())
        }
        IngestError::Parsing(ParseError::NoTextExtracted) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "NO_TEXT_EXTRACTED",
            "No text could be extracted from the resume".to_string(),
        ),
        IngestError::Parsing(inner) => {
            tracing::error!("Resume parsing failed: {inner}");
            (
                StatusCode::BAD_GATEWAY,
                "PARSER_ERROR",
                format!("Failed to parse resume: {inner}"),
            )
        }
        IngestError::Storage(_) | IngestError::Extraction(_) | IngestError::Persistence(_) => {
            tracing::error!("Resume {stage} failed: {e}");
            let code = match stage {
                IngestStage::Stored => "STORAGE_ERROR",
                IngestStage::Extracted => "EXTRACTION_ERROR",
                _ => "PERSISTENCE_ERROR",
            };
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                code,
                format!("Resume {stage} failed"),
            )
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Authentication required".to_string(),
            ),
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                "Insufficient permissions".to_string(),
            ),
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Ingest(e) => ingest_response(e),
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
    use crate::llm_client::LlmError;

    fn status_of(e: IngestError) -> StatusCode {
        AppError::from(e).into_response().status()
    }

    #[test]
    fn test_ingest_status_classes() {
        assert_eq!(
            status_of(IngestError::UnsupportedFormat("cv.txt".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(IngestError::Storage(std::io::Error::other("disk full"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(IngestError::Extraction(ExtractError::MalformedDocument(
                "bad xref".into()
            ))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(IngestError::Parsing(ParseError::NoTextExtracted)),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(IngestError::Parsing(ParseError::Completion(LlmError::Api {
                status: 500,
                message: "boom".into()
            }))),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(IngestError::Persistence(StoreError::Database(
                sqlx::Error::PoolTimedOut
            ))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_auth_errors_map_to_unauthorized() {
        let err = jsonwebtoken::errors::Error::from(
            jsonwebtoken::errors::ErrorKind::InvalidToken,
        );
        let response = AppError::from(AuthError::InvalidToken(err)).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
