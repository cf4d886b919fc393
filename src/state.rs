use crate::{config::Config, redis_client::RedisClient, websocket::PresenceRegistry};
use sqlx::{Pool, Postgres};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: Pool<Postgres>,
    pub redis: RedisClient,
    pub presence: PresenceRegistry,
    pub config: Arc<Config>,
}
