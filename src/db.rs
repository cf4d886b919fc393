use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;

/// Build the service's Postgres pool. The acquire timeout keeps a saturated
/// pool from hanging callers; the error surfaces as `sqlx::Error::PoolTimedOut`.
pub async fn init_pool(database_url: &str, max_connections: u32) -> Result<Pool<Postgres>, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(database_url)
        .await
}
