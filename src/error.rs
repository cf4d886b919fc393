use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("server start failure: {0}")]
    StartServer(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("amount must be positive")]
    InvalidAmount,

    #[error("insufficient balance")]
    InsufficientBalance,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("order not found")]
    OrderNotFound,

    #[error("report already processed")]
    AlreadyProcessed,

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("not found")]
    NotFound,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("internal server error")]
    Internal,
}

impl AppError {
    /// Returns whether this error is retryable (e.g., database connection timeout)
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Database(e) => {
                matches!(
                    e,
                    sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
                )
            }
            AppError::Redis(e) => e.is_timeout() || e.is_connection_dropped(),
            AppError::Internal => true,
            _ => false,
        }
    }

    /// Returns HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::BadRequest(_) | AppError::InvalidAmount | AppError::InvalidSignature => 400,
            AppError::Unauthorized => 401,
            AppError::Forbidden => 403,
            AppError::NotFound | AppError::OrderNotFound => 404,
            AppError::InsufficientBalance | AppError::AlreadyProcessed => 409,
            AppError::Database(_) | AppError::Redis(_) | AppError::Internal => 500,
            _ => 500,
        }
    }
}

impl actix_web::ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(AppError::status_code(self)).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::Database(e) => tracing::error!(error = %e, "database error"),
            AppError::Redis(e) => tracing::error!(error = %e, "redis error"),
            AppError::Internal => tracing::error!("internal error"),
            _ => {}
        }
        HttpResponse::build(actix_web::ResponseError::status_code(self))
            .json(serde_json::json!({ "error": self.to_string() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_errors_map_to_client_statuses() {
        assert_eq!(AppError::InsufficientBalance.status_code(), 409);
        assert_eq!(AppError::AlreadyProcessed.status_code(), 409);
        assert_eq!(AppError::InvalidSignature.status_code(), 400);
        assert_eq!(AppError::OrderNotFound.status_code(), 404);
        assert_eq!(AppError::Forbidden.status_code(), 403);
    }

    #[test]
    fn pool_timeout_is_retryable() {
        assert!(AppError::Database(sqlx::Error::PoolTimedOut).is_retryable());
        assert!(!AppError::InsufficientBalance.is_retryable());
    }
}
