use actix_web::{web, App, HttpServer};
use ledger_service::{
    config, db, error, logging, middleware, migrations, redis_client::RedisClient, routes,
    state::AppState, websocket::PresenceRegistry,
};
use std::sync::Arc;

#[actix_web::main]
async fn main() -> Result<(), error::AppError> {
    logging::init_tracing();
    let cfg = Arc::new(config::Config::from_env()?);

    let db = db::init_pool(&cfg.database_url, cfg.db_max_connections)
        .await
        .map_err(|e| error::AppError::StartServer(format!("db: {e}")))?;

    // Treat migration failures as fatal - the database schema must be in sync
    migrations::run_all(&db)
        .await
        .map_err(|e| error::AppError::StartServer(format!("database migrations failed: {e}")))?;

    let redis = RedisClient::from_url(&cfg.redis_url)
        .await
        .map_err(|e| error::AppError::StartServer(format!("redis: {e}")))?;

    let presence = PresenceRegistry::new();

    let state = AppState {
        db: db.clone(),
        redis,
        presence,
        config: cfg.clone(),
    };

    let bind_addr = format!("0.0.0.0:{}", cfg.port);
    tracing::info!(%bind_addr, "starting ledger-service");

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .configure(routes::configure_routes)
            // Registered inside-out: JwtAuthMiddleware runs first and
            // populates UserId, BanGuardMiddleware consumes it.
            .wrap(middleware::BanGuardMiddleware)
            .wrap(middleware::JwtAuthMiddleware)
    })
    .bind(&bind_addr)
    .map_err(|e| error::AppError::StartServer(e.to_string()))?
    .run()
    .await
    .map_err(|e| error::AppError::StartServer(e.to_string()))?;

    Ok(())
}
