use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::generation::GenerationError;
use crate::retrieval::chunking::ChunkingError;
use crate::retrieval::embeddings::EmbeddingError;
use crate::retrieval::vector::VectorError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("Vector store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let (status, error_message) = match self {
            AppError::Validation(ref e) => (StatusCode::BAD_REQUEST, e.clone()),
            AppError::NotFound(ref e) => (StatusCode::NOT_FOUND, e.clone()),
            AppError::EmbeddingUnavailable(ref e) => {
                tracing::error!("Embedding unavailable: {}", e);
                (
                    StatusCode::BAD_GATEWAY,
                    format!("Embedding unavailable: {}", e),
                )
            }
            AppError::StoreUnavailable(ref e) => {
                tracing::error!("Vector store unavailable: {}", e);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    format!("Vector store unavailable: {}", e),
                )
            }
            AppError::GenerationFailed(ref e) => {
                tracing::error!("Generation failed: {}", e);
                (StatusCode::BAD_GATEWAY, format!("Generation failed: {}", e))
            }
            AppError::Internal(ref e) => {
                tracing::error!("Internal error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.clone())
            }
            AppError::Io(ref e) => {
                tracing::error!("IO error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "IO error".to_string())
            }
        };

        let body = ErrorResponse {
            detail: error_message,
        };

        HttpResponse::build(status).json(body)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::EmbeddingUnavailable(_) => StatusCode::BAD_GATEWAY,
            AppError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::GenerationFailed(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

impl From<EmbeddingError> for AppError {
    fn from(err: EmbeddingError) -> Self {
        AppError::EmbeddingUnavailable(err.to_string())
    }
}

impl From<VectorError> for AppError {
    fn from(err: VectorError) -> Self {
        AppError::StoreUnavailable(err.to_string())
    }
}

impl From<GenerationError> for AppError {
    fn from(err: GenerationError) -> Self {
        AppError::GenerationFailed(err.to_string())
    }
}

impl From<ChunkingError> for AppError {
    fn from(err: ChunkingError) -> Self {
        AppError::Internal(err.to_string())
    }
}
