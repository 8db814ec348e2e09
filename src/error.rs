use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application-level errors
///
/// These are fatal to the call that produced them. Per-item problems inside a
/// catalog run are carried as [`ItemError`] on the item's failure record instead.
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Query image error: {0}")]
    QueryImage(ItemError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::QueryImage(_) => (StatusCode::UNPROCESSABLE_ENTITY, self.to_string()),
            AppError::HttpClient(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            AppError::Database(_)
            | AppError::Cache(_)
            | AppError::Catalog(_)
            | AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// Failure to retrieve or decode a single image
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("image reference is empty")]
    InvalidReference,

    #[error("image unreachable: {0}")]
    Unreachable(String),

    #[error("image fetch timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("image could not be decoded: {0}")]
    DecodeFailed(String),

    #[error("image payload is empty")]
    Empty,
}

/// Failure to turn a normalized image into a feature vector
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("cannot extract features from an empty image")]
    EmptyImage,
}

/// Why a single catalog item ended up without a feature vector
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ItemError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("processing cancelled")]
    Cancelled,

    #[error("worker panicked: {0}")]
    Panicked(String),
}

impl ItemError {
    /// Short machine-readable label, stable across releases
    pub fn kind(&self) -> &'static str {
        match self {
            ItemError::Fetch(FetchError::InvalidReference) => "invalid_reference",
            ItemError::Fetch(FetchError::Unreachable(_)) => "unreachable",
            ItemError::Fetch(FetchError::Timeout(_)) => "timeout",
            ItemError::Fetch(FetchError::DecodeFailed(_)) => "decode_failed",
            ItemError::Fetch(FetchError::Empty) => "empty",
            ItemError::Extract(ExtractError::EmptyImage) => "empty_image",
            ItemError::Cancelled => "cancelled",
            ItemError::Panicked(_) => "panicked",
        }
    }
}
