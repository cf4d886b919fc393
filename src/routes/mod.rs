use actix_web::{web, HttpResponse};

pub mod chat;
pub mod reports;
pub mod wallet;

async fn health() -> HttpResponse {
    HttpResponse::Ok().body("OK")
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/ws", web::get().to(chat::ws_connect))
        .service(
            web::scope("/api/v1")
                .service(
                    web::scope("/wallet")
                        .route("/balance", web::get().to(wallet::get_balance))
                        .route("/recharge", web::post().to(wallet::recharge))
                        .route("/callback", web::post().to(wallet::callback)),
                )
                .service(
                    web::scope("/chat")
                        .route("/conversations", web::get().to(chat::list_conversations))
                        .route(
                            "/conversations/{id}/messages",
                            web::get().to(chat::message_history),
                        ),
                )
                .route("/reports", web::post().to(reports::create_report))
                .service(
                    web::scope("/admin")
                        .route("/reports", web::get().to(reports::list_reports))
                        .route(
                            "/reports/{id}/process",
                            web::post().to(reports::process_report),
                        ),
                ),
        );
}
