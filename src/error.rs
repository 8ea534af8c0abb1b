use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
};

use crate::scraper::ScrapeError;

/// Failures of the flat-file result store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("result file not found: {0}")]
    NotFound(String),

    #[error("refusing to access path outside the result store: {0}")]
    Forbidden(String),

    #[error("{0}")]
    Corrupt(String),

    #[error("result file already exists: {0}")]
    AlreadyExists(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode result: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Missing credentials in .env (SHOPEE_USERNAME/SHOPEE_PASSWORD)")]
    MissingCredentials,

    #[error("Scrape failed: {0}")]
    ScrapeFailed(String),

    #[error("Result file not found.")]
    NotFound,

    #[error("Forbidden path.")]
    Forbidden,

    #[error("Error reading file: {0}")]
    Corrupt(String),

    #[error("Storage error: {0}")]
    Io(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::MissingCredentials => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ScrapeFailed(_) => StatusCode::BAD_GATEWAY,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Corrupt(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, self.to_string()).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => AppError::NotFound,
            StoreError::Forbidden(_) => AppError::Forbidden,
            StoreError::Corrupt(msg) => AppError::Corrupt(msg),
            other => AppError::Io(other.to_string()),
        }
    }
}

impl From<ScrapeError> for AppError {
    fn from(err: ScrapeError) -> Self {
        AppError::ScrapeFailed(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
