use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("No PDF file part in the request")]
    MissingFiles,

    #[error("An OCR API key is required")]
    MissingApiKey,

    #[error("No PDF files were selected")]
    NoFilesSelected,

    #[error("No valid PDF files found.{}", skipped_suffix(.skipped))]
    NoValidFiles { skipped: Vec<String> },

    #[error("All PDF processing attempts failed.")]
    AllFailed { details: Vec<String> },

    #[error("No files were processed successfully.")]
    NothingProcessed,

    #[error("Invalid path")]
    InvalidPath,

    #[error("{what} not found")]
    NotFound { what: &'static str },

    #[error("Rate limit exceeded: maximum concurrent requests reached")]
    RateLimitExceeded,

    #[error("Invalid upload: {message}")]
    InvalidFile { message: String },

    #[error("Internal server error: {message}")]
    Internal { message: String },
}

fn skipped_suffix(skipped: &[String]) -> String {
    if skipped.is_empty() {
        String::new()
    } else {
        format!(" Skipped invalid files: {}", skipped.join(", "))
    }
}

impl AppError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::MissingFiles => "MISSING_FILES",
            AppError::MissingApiKey => "MISSING_API_KEY",
            AppError::NoFilesSelected => "NO_FILES_SELECTED",
            AppError::NoValidFiles { .. } => "NO_VALID_FILES",
            AppError::AllFailed { .. } => "ALL_FAILED",
            AppError::NothingProcessed => "NOTHING_PROCESSED",
            AppError::InvalidPath => "INVALID_PATH",
            AppError::NotFound { .. } => "NOT_FOUND",
            AppError::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            AppError::InvalidFile { .. } => "INVALID_FILE",
            AppError::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::MissingFiles => StatusCode::BAD_REQUEST,
            AppError::MissingApiKey => StatusCode::BAD_REQUEST,
            AppError::NoFilesSelected => StatusCode::BAD_REQUEST,
            AppError::NoValidFiles { .. } => StatusCode::BAD_REQUEST,
            AppError::AllFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NothingProcessed => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InvalidPath => StatusCode::BAD_REQUEST,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            AppError::InvalidFile { .. } => StatusCode::BAD_REQUEST,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Per-item messages attached to an aggregate failure.
    pub fn details(&self) -> Option<&[String]> {
        match self {
            AppError::AllFailed { details } => Some(details),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();
        let message = self.to_string();
        let request_id = Uuid::new_v4().to_string();
        let timestamp = chrono::Utc::now().to_rfc3339();

        if status.is_server_error() {
            tracing::error!(
                error_code = error_code,
                status_code = %status,
                request_id = %request_id,
                error_message = %message,
                "API error occurred"
            );
        } else {
            tracing::warn!(
                error_code = error_code,
                status_code = %status,
                request_id = %request_id,
                error_message = %message,
                "Request rejected"
            );
        }

        let mut body = json!({
            "error": message,
            "code": error_code,
            "request_id": request_id,
            "timestamp": timestamp,
        });
        if let Some(details) = self.details() {
            body["details"] = json!(details);
        }

        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: format!("IO error: {}", err),
        }
    }
}

impl From<axum::extract::multipart::MultipartError> for AppError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        AppError::InvalidFile {
            message: format!("Failed to read multipart field: {}", err),
        }
    }
}

impl AppError {
    pub fn internal(message: impl Into<String>) -> Self {
        AppError::Internal {
            message: message.into(),
        }
    }

    pub fn not_found(what: &'static str) -> Self {
        AppError::NotFound { what }
    }
}
