use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// The application's error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// A database error.
    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    /// A connection pool error.
    #[error("Pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    /// A Redis error.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// A missing or empty required field.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Login failed. Deliberately does not say which factor was wrong.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// No session, an unknown session, or an expired one.
    #[error("Authentication required")]
    Unauthenticated,

    /// A resource not found error.
    #[error("Resource not found")]
    NotFound,

    /// A stored blob failed authentication or could not be parsed.
    #[error("Integrity check failed")]
    Integrity,

    /// A unique key already exists.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A persistence call exceeded its deadline.
    #[error("Operation timed out")]
    Timeout,

    /// An encryption error.
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// An internal server error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// A `Result` type that uses `AppError` as the error type.
pub type Result<T> = std::result::Result<T, AppError>;

impl From<garde::Report> for AppError {
    fn from(report: garde::Report) -> Self {
        AppError::Validation(report.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }

            AppError::Pool(ref e) => {
                tracing::error!("Pool error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }

            AppError::Redis(ref e) => {
                tracing::error!("Redis error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Session store error".to_string())
            }

            AppError::Validation(ref msg) => {
                tracing::debug!("Validation error: {}", msg);
                (StatusCode::BAD_REQUEST, msg.clone())
            }

            AppError::InvalidCredentials => {
                tracing::warn!("Invalid credentials");
                (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string())
            }

            AppError::Unauthenticated => {
                tracing::debug!("Unauthenticated request");
                (StatusCode::UNAUTHORIZED, "Authentication required".to_string())
            }

            AppError::NotFound => {
                tracing::debug!("Resource not found");
                (StatusCode::NOT_FOUND, "Not found".to_string())
            }

            AppError::Integrity => {
                tracing::error!("Stored ciphertext failed integrity check");
                (StatusCode::INTERNAL_SERVER_ERROR, "Decrypt error".to_string())
            }

            AppError::Conflict(ref msg) => {
                tracing::debug!("Conflict: {}", msg);
                (StatusCode::CONFLICT, msg.clone())
            }

            AppError::Timeout => {
                tracing::warn!("Store operation timed out");
                (StatusCode::SERVICE_UNAVAILABLE, "Temporarily unavailable, retry".to_string())
            }

            AppError::Encryption(ref msg) => {
                tracing::error!("Encryption error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Encryption error".to_string())
            }

            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = sonic_rs::to_string(&sonic_rs::json!({
            "error": message
        }))
        .unwrap_or_else(|_| r#"{"error":"Internal server error"}"#.to_string());

        (status, [(http::header::CONTENT_TYPE, "application/json")], body).into_response()
    }
}
