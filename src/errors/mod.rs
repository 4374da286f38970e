//! Error handling module for the blog backend.
//!
//! Provides centralized error types with mapping to HTTP status codes and the JSON error body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const BAD_REQUEST: &str = "BAD_REQUEST";
    pub const DATABASE_ERROR: &str = "DATABASE_ERROR";
    pub const IMPORT_ERROR: &str = "IMPORT_ERROR";
    pub const TRANSPORT_ERROR: &str = "TRANSPORT_ERROR";
    pub const MALFORMED_RESPONSE: &str = "MALFORMED_RESPONSE";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    /// Document not found (unknown slug)
    NotFound(String),
    /// Bad request
    BadRequest(String),
    /// Content store (SQLite) error
    Database(String),
    /// Content export could not be imported
    Import(String),
    /// Upstream could not be reached
    Transport(String),
    /// Upstream answered with a body of the wrong shape
    MalformedResponse(String),
    /// Internal server error
    Internal(String),
}

impl AppError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Import(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::MalformedResponse(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => codes::NOT_FOUND,
            AppError::BadRequest(_) => codes::BAD_REQUEST,
            AppError::Database(_) => codes::DATABASE_ERROR,
            AppError::Import(_) => codes::IMPORT_ERROR,
            AppError::Transport(_) => codes::TRANSPORT_ERROR,
            AppError::MalformedResponse(_) => codes::MALFORMED_RESPONSE,
            AppError::Internal(_) => codes::INTERNAL_ERROR,
        }
    }

    /// Get the error message.
    pub fn message(&self) -> String {
        match self {
            AppError::NotFound(msg) => msg.clone(),
            AppError::BadRequest(msg) => msg.clone(),
            AppError::Database(msg) => msg.clone(),
            AppError::Import(msg) => msg.clone(),
            AppError::Transport(msg) => msg.clone(),
            AppError::MalformedResponse(msg) => msg.clone(),
            AppError::Internal(msg) => msg.clone(),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl std::error::Error for AppError {}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        AppError::Database(format!("Database error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("JSON error: {:?}", err);
        AppError::BadRequest(format!("JSON error: {}", err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        tracing::error!("I/O error: {:?}", err);
        AppError::Internal(format!("I/O error: {}", err))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        tracing::error!("Upstream request error: {:?}", err);
        if err.is_decode() {
            AppError::MalformedResponse(format!("Malformed response: {}", err))
        } else {
            AppError::Transport(format!("Request failed: {}", err))
        }
    }
}

/// JSON body returned for every failed request.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ErrorResponse {
    pub fn new(error: &AppError) -> Self {
        Self {
            error: error.message(),
            code: error.error_code().to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse::new(&self);
        (status, Json(body)).into_response()
    }
}
