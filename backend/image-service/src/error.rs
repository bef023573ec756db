/// Error types for Image Service
///
/// Every gateway and orchestrator failure is one of these kinds. Errors are
/// converted to HTTP responses for API clients; the worker only logs them.
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for image-service operations
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Debug, Error)]
pub enum AppError {
    /// Upload rejected before any side effect
    #[error("Validation error: {0}")]
    Validation(String),

    /// Record or object key absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Record exists but the worker has not finished yet
    #[error("Image is still being processed: {0}")]
    Pending(String),

    /// Record exists but processing ended in failure
    #[error("Image processing failed: {0}")]
    ProcessingFailed(String),

    #[error("Storage write error: {0}")]
    StorageWrite(String),

    #[error("Storage read error: {0}")]
    StorageRead(String),

    #[error("Metadata write error: {0}")]
    MetaWrite(String),

    #[error("Metadata read error: {0}")]
    MetaRead(String),

    #[error("Task publish error: {0}")]
    BusPublish(String),

    #[error("Task consume error: {0}")]
    BusConsume(String),

    #[error("Transform error: {0}")]
    Transform(String),

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    /// Startup dependency could not be reached within its retry budget
    #[error("Dependency unavailable: {0}")]
    Unavailable(String),

    /// Malformed request (multipart parse, oversize body)
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Machine-readable code used in API error bodies and metric labels
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "IMAGE_NOT_FOUND",
            AppError::Pending(_) => "IMAGE_PENDING",
            AppError::ProcessingFailed(_) => "IMAGE_PROCESSING_FAILED",
            AppError::StorageWrite(_) => "STORAGE_WRITE_ERROR",
            AppError::StorageRead(_) => "STORAGE_READ_ERROR",
            AppError::MetaWrite(_) => "METADATA_WRITE_ERROR",
            AppError::MetaRead(_) => "METADATA_READ_ERROR",
            AppError::BusPublish(_) => "BUS_PUBLISH_ERROR",
            AppError::BusConsume(_) => "BUS_CONSUME_ERROR",
            AppError::Transform(_) => "TRANSFORM_ERROR",
            AppError::UnknownAction(_) => "UNKNOWN_ACTION",
            AppError::Unavailable(_) => "SERVICE_UNAVAILABLE",
            AppError::BadRequest(_) => "INVALID_REQUEST",
            AppError::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }
}

/// JSON body returned for every API error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status: u16,
    pub error_type: String,
    pub code: String,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error: &str, message: &str, status: u16, error_type: &str, code: &str) -> Self {
        Self {
            error: error.to_string(),
            message: message.to_string(),
            status,
            error_type: error_type.to_string(),
            code: code.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) | AppError::Pending(_) | AppError::ProcessingFailed(_) => {
                StatusCode::NOT_FOUND
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let error_type = match status {
            StatusCode::BAD_REQUEST => "validation_error",
            StatusCode::NOT_FOUND => "not_found_error",
            _ => "server_error",
        };

        let response = ErrorResponse::new(
            status.canonical_reason().unwrap_or("Error"),
            &self.to_string(),
            status.as_u16(),
            error_type,
            self.code(),
        );

        HttpResponse::build(status).json(response)
    }
}
