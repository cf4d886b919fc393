use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Message, MessageKind};

/// Events a connected client may send over the chat gateway.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    SendMessage {
        receiver_id: Uuid,
        content: String,
        kind: MessageKind,
    },
}

/// Events pushed back to clients. The sender of a message always receives
/// `message_sent`; the receiver gets `receive_message` only while connected.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    MessageSent { message: Message, fee_charged: bool },
    ReceiveMessage { message: Message },
    Error { message: String },
}
