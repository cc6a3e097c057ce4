use std::path::PathBuf;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::config::ConfigError;
use crate::models::ApiResponse;

/// Errors surfaced to HTTP callers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Booking not found: {0}")]
    BookingNotFound(String),

    #[error("Client not found: {0}")]
    ClientNotFound(String),

    #[error("Invalid booking: {0}")]
    Validation(String),

    #[error("Invalid query parameter: {0}")]
    BadQuery(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BookingNotFound(_) | ApiError::ClientNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) | ApiError::BadQuery(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        log::warn!("Request rejected: {}", self);
        (self.status_code(), Json(ApiResponse::error(self.to_string()))).into_response()
    }
}

/// Errors that stop the server from starting
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to read seed file {path}: {source}")]
    SeedRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse seed file {path}: {source}")]
    SeedParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
