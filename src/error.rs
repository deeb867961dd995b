use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Caller-facing message when no model artifact is loaded
pub const MODEL_UNAVAILABLE_MESSAGE: &str = "Model tidak tersedia, periksa log server.";

/// Caller-facing message for an empty or missing request body
pub const MISSING_BODY_MESSAGE: &str = "Data tidak ditemukan dalam request";

/// Caller-facing message for any failure while scoring a record
pub const INTERNAL_ERROR_MESSAGE: &str = "Terjadi kesalahan internal pada server.";

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// No usable model artifact is loaded
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// Request body missing, empty or unparseable
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Record does not match the expected applicant schema
    #[error("Validation error: {0}")]
    Validation(String),

    /// Transform or classifier failure
    #[error("Processing error: {0}")]
    Processing(String),

    /// Training data could not be read or interpreted
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Artifact is corrupt or violates its output contract
    #[error("Artifact error: {0}")]
    Artifact(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AppError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::ModelUnavailable(_)
            | AppError::Validation(_)
            | AppError::Processing(_)
            | AppError::Dataset(_)
            | AppError::Artifact(_)
            | AppError::Configuration(_)
            | AppError::Io(_)
            | AppError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code string
    pub fn error_code(&self) -> &str {
        match self {
            AppError::ModelUnavailable(_) => "MODEL_UNAVAILABLE",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Processing(_) => "PROCESSING_ERROR",
            AppError::Dataset(_) => "DATASET_ERROR",
            AppError::Artifact(_) => "ARTIFACT_ERROR",
            AppError::Configuration(_) => "CONFIGURATION_ERROR",
            AppError::Io(_) => "IO_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Fixed message returned to HTTP callers. Internal detail never leaves the server.
    pub fn public_message(&self) -> &'static str {
        match self {
            AppError::ModelUnavailable(_) => MODEL_UNAVAILABLE_MESSAGE,
            AppError::BadRequest(_) => MISSING_BODY_MESSAGE,
            _ => INTERNAL_ERROR_MESSAGE,
        }
    }
}

/// Convert AppError to HTTP response
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(
                error_code = error_code,
                status_code = status.as_u16(),
                error = ?self,
                message = %message,
                "Request error"
            );
        } else {
            tracing::warn!(
                error_code = error_code,
                status_code = status.as_u16(),
                message = %message,
                "Request rejected"
            );
        }

        let body = Json(json!({ "error": self.public_message() }));

        (status, body).into_response()
    }
}

/// Conversion from serde_json::Error
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Conversion from bincode::Error
impl From<bincode::Error> for AppError {
    fn from(err: bincode::Error) -> Self {
        AppError::Artifact(err.to_string())
    }
}

/// Conversion from csv::Error
impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        match err.position() {
            Some(position) => AppError::Dataset(format!("line {}: {}", position.line(), err)),
            None => AppError::Dataset(err.to_string()),
        }
    }
}

/// Conversion from ndarray::ShapeError
impl From<ndarray::ShapeError> for AppError {
    fn from(err: ndarray::ShapeError) -> Self {
        AppError::Processing(err.to_string())
    }
}

/// Conversion from validator::ValidationErrors
impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Configuration(err.to_string())
    }
}

/// Conversion from config::ConfigError
impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, AppError>;
