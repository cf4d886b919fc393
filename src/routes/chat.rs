use actix_web::{web, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use serde::Deserialize;
use uuid::Uuid;

use crate::cache::status_cache;
use crate::error::AppError;
use crate::middleware::jwt_auth;
use crate::middleware::UserId;
use crate::models::{ConversationSummary, Message};
use crate::services::chat_service::ChatService;
use crate::state::AppState;
use crate::websocket::session::ChatSession;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: String,
}

pub async fn list_conversations(
    user: UserId,
    state: web::Data<AppState>,
) -> Result<web::Json<Vec<ConversationSummary>>, AppError> {
    let conversations = ChatService::list_conversations(&state.db, user.0).await?;
    Ok(web::Json(conversations))
}

pub async fn message_history(
    user: UserId,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<web::Json<Vec<Message>>, AppError> {
    let messages = ChatService::message_history(&state.db, path.into_inner(), user.0).await?;
    Ok(web::Json(messages))
}

/// Chat gateway handshake. The JWT middleware skips this path: the token
/// arrives as a query parameter because browsers cannot set websocket
/// headers. Banned accounts are rejected before the upgrade.
pub async fn ws_connect(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<AppState>,
    query: web::Query<WsQuery>,
) -> Result<HttpResponse, actix_web::Error> {
    let account_id = jwt_auth::decode_user_id(&state.config.jwt_secret, &query.token)?;

    match status_cache::get_status(
        &state.redis,
        &state.db,
        account_id,
        state.config.status_cache_ttl_secs,
    )
    .await?
    {
        crate::models::AccountStatus::Banned => Err(AppError::Forbidden.into()),
        crate::models::AccountStatus::Normal => {
            ws::start(ChatSession::new(account_id, state.clone()), &req, stream)
        }
    }
}
