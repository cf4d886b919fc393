use actix::{Actor, ActorContext, ActorFutureExt, AsyncContext, StreamHandler};
use actix_web::web;
use actix_web_actors::ws;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tokio_stream::wrappers::UnboundedReceiverStream;
use uuid::Uuid;

use crate::cache::status_cache;
use crate::error::AppError;
use crate::models::AccountStatus;
use crate::services::chat_service::{ChatService, SentMessage};
use crate::state::AppState;
use crate::websocket::events::{ClientEvent, ServerEvent};

/// One authenticated chat connection. Registers itself in the presence
/// directory on start and removes itself on stop; inbound `send_message`
/// events run fee metering and persistence before any delivery.
pub struct ChatSession {
    account_id: Uuid,
    state: web::Data<AppState>,
    handle: Option<UnboundedSender<String>>,
}

impl ChatSession {
    pub fn new(account_id: Uuid, state: web::Data<AppState>) -> Self {
        Self {
            account_id,
            state,
            handle: None,
        }
    }

    fn send_event(ctx: &mut ws::WebsocketContext<Self>, event: &ServerEvent) {
        match serde_json::to_string(event) {
            Ok(json) => ctx.text(json),
            Err(e) => tracing::error!(error = %e, "failed to serialize server event"),
        }
    }

    fn handle_client_event(&self, text: &str, ctx: &mut ws::WebsocketContext<Self>) {
        let event = match serde_json::from_str::<ClientEvent>(text) {
            Ok(event) => event,
            Err(_) => {
                Self::send_event(
                    ctx,
                    &ServerEvent::Error {
                        message: "malformed event".into(),
                    },
                );
                return;
            }
        };

        match event {
            ClientEvent::SendMessage {
                receiver_id,
                content,
                kind,
            } => {
                let state = self.state.clone();
                let sender_id = self.account_id;

                let fut = async move {
                    // The connection outlives moderation decisions, so the
                    // ban status is re-checked on every send.
                    match status_cache::get_status(
                        &state.redis,
                        &state.db,
                        sender_id,
                        state.config.status_cache_ttl_secs,
                    )
                    .await?
                    {
                        AccountStatus::Banned => return Err(AppError::Unauthorized),
                        AccountStatus::Normal => {}
                    }

                    let sent =
                        ChatService::send_message(&state.db, sender_id, receiver_id, &content, kind)
                            .await?;

                    // Push to the receiver if connected; a dead handle fails
                    // soft and never blocks the sender's ack.
                    if let Ok(push) = serde_json::to_string(&ServerEvent::ReceiveMessage {
                        message: sent.message.clone(),
                    }) {
                        state.presence.push(receiver_id, &push);
                    }

                    Ok::<SentMessage, AppError>(sent)
                };

                ctx.spawn(actix::fut::wrap_future(fut).map(
                    |result, _act: &mut Self, ctx| match result {
                        Ok(sent) => Self::send_event(
                            ctx,
                            &ServerEvent::MessageSent {
                                message: sent.message,
                                fee_charged: sent.fee_charged,
                            },
                        ),
                        Err(e) => Self::send_event(
                            ctx,
                            &ServerEvent::Error {
                                message: e.to_string(),
                            },
                        ),
                    },
                ));
            }
        }
    }
}

impl Actor for ChatSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        let (tx, rx) = unbounded_channel();
        self.state.presence.register(self.account_id, tx.clone());
        self.handle = Some(tx);
        ctx.add_stream(UnboundedReceiverStream::new(rx));
        tracing::info!(account_id = %self.account_id, "chat connection established");
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        if let Some(handle) = self.handle.take() {
            self.state.presence.unregister(self.account_id, &handle);
        }
        tracing::info!(account_id = %self.account_id, "chat connection closed");
    }
}

/// Payloads pushed through the presence directory land here and go out on
/// the socket.
impl StreamHandler<String> for ChatSession {
    fn handle(&mut self, payload: String, ctx: &mut Self::Context) {
        ctx.text(payload);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for ChatSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Text(text)) => self.handle_client_event(&text, ctx),
            Ok(ws::Message::Ping(payload)) => ctx.pong(&payload),
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Err(_) => ctx.stop(),
            _ => {}
        }
    }
}
