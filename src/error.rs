use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Message shown to clients whenever a drama search fails.
///
/// The underlying error is logged, never returned.
pub const SEARCH_ERROR_MESSAGE: &str = "Error fetching dramas. Please try again later.";

pub const STORE_ERROR_MESSAGE: &str = "Trending store unavailable";

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// True for failures talking to the metadata provider
    pub fn is_network(&self) -> bool {
        matches!(self, AppError::Network(_) | AppError::HttpClient(_))
    }

    /// True for failures reading or writing trending records
    pub fn is_store(&self) -> bool {
        matches!(
            self,
            AppError::Store(_) | AppError::Database(_) | AppError::Redis(_)
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = if self.is_network() {
            tracing::error!(error = %self, "Drama search failed");
            (StatusCode::BAD_GATEWAY, SEARCH_ERROR_MESSAGE.to_string())
        } else if self.is_store() {
            tracing::error!(error = %self, "Trending store failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                STORE_ERROR_MESSAGE.to_string(),
            )
        } else {
            match &self {
                AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
                AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
                _ => {
                    tracing::error!(error = %self, "Unhandled internal error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Internal server error".to_string(),
                    )
                }
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
