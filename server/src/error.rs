//! Error types for the form uploader
//!
//! All errors use thiserror for structured error handling.
//! Errors raised while serving a request are turned into plain-text HTTP
//! responses: binding problems are the client's fault (400), everything
//! else aborts the workflow with a server error (500).

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Body sent for every 5xx response
pub const INTERNAL_ERROR_BODY: &str = "Internal server error";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed multipart body: {0}")]
    Multipart(#[from] MultipartError),

    #[error("Invalid form submission: {0}")]
    InvalidForm(String),

    #[error("Blob storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// HTTP status reported to the caller for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidForm(_) => StatusCode::BAD_REQUEST,
            AppError::Multipart(e) => e.status(),
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            // Storage endpoints and error codes stay in the log
            tracing::error!("Request failed: {}", self);
            return (status, INTERNAL_ERROR_BODY).into_response();
        }

        tracing::debug!("Rejected request: {}", self);
        (status, self.to_string()).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
