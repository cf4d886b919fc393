use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub port: u16,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    /// Shared secret for the payment gateway's signed callbacks.
    pub payment_callback_secret: String,
    pub payment_gateway_url: String,
    pub status_cache_ttl_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, crate::error::AppError> {
        dotenv().ok();
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| crate::error::AppError::Config("DATABASE_URL missing".into()))?;
        let redis_url = env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into());
        let port = env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);
        let db_max_connections = env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(20);
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| crate::error::AppError::Config("JWT_SECRET missing".into()))?;
        let payment_callback_secret = env::var("PAYMENT_CALLBACK_SECRET").map_err(|_| {
            crate::error::AppError::Config("PAYMENT_CALLBACK_SECRET missing".into())
        })?;
        let payment_gateway_url = env::var("PAYMENT_GATEWAY_URL")
            .unwrap_or_else(|_| "https://pay.example.com/pay".into());
        let status_cache_ttl_secs = env::var("STATUS_CACHE_TTL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3600);

        Ok(Self {
            database_url,
            redis_url,
            port,
            db_max_connections,
            jwt_secret,
            payment_callback_secret,
            payment_gateway_url,
            status_cache_ttl_secs,
        })
    }

    #[cfg(test)]
    pub fn test_defaults() -> Self {
        Self {
            database_url: "postgres://localhost/test".into(),
            redis_url: "redis://127.0.0.1:6379/0".into(),
            port: 3000,
            db_max_connections: 5,
            jwt_secret: "test-jwt-secret".into(),
            payment_callback_secret: "test-callback-secret".into(),
            payment_gateway_url: "https://pay.example.com/pay".into(),
            status_cache_ttl_secs: 3600,
        }
    }
}
