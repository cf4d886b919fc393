use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Conversation, ConversationSummary, Message, MessageKind, TransactionKind};

use super::wallet_service::WalletService;

/// Messages a sender may send in a conversation before each further message
/// costs [`MESSAGE_FEE`].
const FREE_MESSAGES_PER_SENDER: i64 = 3;
const MESSAGE_FEE: Decimal = Decimal::ONE;
/// Conversation-list summary shown in place of raw image payloads.
const IMAGE_SUMMARY_PLACEHOLDER: &str = "[Image]";
const HISTORY_PAGE_LIMIT: i64 = 100;

#[derive(Debug, Clone, Serialize)]
pub struct SentMessage {
    pub message: Message,
    pub fee_charged: bool,
}

/// Canonical conversation pair: the smaller id is always side 1.
pub(crate) fn canonical_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Fee decision for the next message, given how many the sender already sent
/// in this conversation.
fn fee_due(sent_count: i64) -> bool {
    // No fee-exempt relationship is reachable yet; every sender pays once
    // past the free allowance.
    // TODO: wire a friendship lookup here when the social-graph service
    // exposes one, instead of charging unconditionally.
    let fee_exempt = false;

    !fee_exempt && sent_count >= FREE_MESSAGES_PER_SENDER
}

pub struct ChatService;

impl ChatService {
    async fn get_or_create_conversation(
        db: &Pool<Postgres>,
        sender_id: Uuid,
        receiver_id: Uuid,
    ) -> Result<Conversation, AppError> {
        let (user1_id, user2_id) = canonical_pair(sender_id, receiver_id);

        sqlx::query(
            r#"
            INSERT INTO conversations (id, user1_id, user2_id, created_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (user1_id, user2_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user1_id)
        .bind(user2_id)
        .execute(db)
        .await?;

        let conversation = sqlx::query_as::<_, Conversation>(
            r#"
            SELECT id, user1_id, user2_id, last_message_content, last_message_at,
                   unread_count1, unread_count2, created_at
            FROM conversations
            WHERE user1_id = $1 AND user2_id = $2
            "#,
        )
        .bind(user1_id)
        .bind(user2_id)
        .fetch_one(db)
        .await?;

        Ok(conversation)
    }

    /// Persist a message, charging the per-message fee once the sender has
    /// used up the free allowance for this conversation.
    ///
    /// An `InsufficientBalance` from the fee charge aborts the whole send:
    /// no message row is written and no conversation counter moves.
    pub async fn send_message(
        db: &Pool<Postgres>,
        sender_id: Uuid,
        receiver_id: Uuid,
        content: &str,
        kind: MessageKind,
    ) -> Result<SentMessage, AppError> {
        if sender_id == receiver_id {
            return Err(AppError::BadRequest("cannot message yourself".into()));
        }

        let conversation = Self::get_or_create_conversation(db, sender_id, receiver_id).await?;

        let sent_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM messages WHERE conversation_id = $1 AND sender_id = $2",
        )
        .bind(conversation.id)
        .bind(sender_id)
        .fetch_one(db)
        .await?;

        let fee_charged = fee_due(sent_count);
        if fee_charged {
            WalletService::consume(
                db,
                sender_id,
                MESSAGE_FEE,
                TransactionKind::Consume,
                Some(&format!("chat fee to user:{receiver_id}")),
            )
            .await?;
        }

        let mut tx = db.begin().await?;

        let message = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (id, conversation_id, sender_id, receiver_id, content, kind, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            RETURNING id, conversation_id, sender_id, receiver_id, content, kind, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(conversation.id)
        .bind(sender_id)
        .bind(receiver_id)
        .bind(content)
        .bind(kind)
        .fetch_one(&mut *tx)
        .await?;

        let summary = match kind {
            MessageKind::Image => IMAGE_SUMMARY_PLACEHOLDER,
            MessageKind::Text => content,
        };

        // The unread counter of the *other* side moves.
        if sender_id == conversation.user1_id {
            sqlx::query(
                r#"
                UPDATE conversations
                SET last_message_content = $1, last_message_at = $2, unread_count2 = unread_count2 + 1
                WHERE id = $3
                "#,
            )
            .bind(summary)
            .bind(message.created_at)
            .bind(conversation.id)
            .execute(&mut *tx)
            .await?;
        } else {
            sqlx::query(
                r#"
                UPDATE conversations
                SET last_message_content = $1, last_message_at = $2, unread_count1 = unread_count1 + 1
                WHERE id = $3
                "#,
            )
            .bind(summary)
            .bind(message.created_at)
            .bind(conversation.id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::debug!(
            message_id = %message.id,
            conversation_id = %conversation.id,
            sender_id = %sender_id,
            fee_charged,
            "message stored"
        );

        Ok(SentMessage {
            message,
            fee_charged,
        })
    }

    /// Conversation list for one participant, most recent first.
    pub async fn list_conversations(
        db: &Pool<Postgres>,
        account_id: Uuid,
    ) -> Result<Vec<ConversationSummary>, AppError> {
        let conversations = sqlx::query_as::<_, Conversation>(
            r#"
            SELECT id, user1_id, user2_id, last_message_content, last_message_at,
                   unread_count1, unread_count2, created_at
            FROM conversations
            WHERE user1_id = $1 OR user2_id = $1
            ORDER BY last_message_at DESC NULLS LAST
            LIMIT 100
            "#,
        )
        .bind(account_id)
        .fetch_all(db)
        .await?;

        Ok(conversations
            .into_iter()
            .map(|c| {
                let other_user_id = if c.user1_id == account_id {
                    c.user2_id
                } else {
                    c.user1_id
                };
                let unread_count = c.unread_count_for(account_id);
                ConversationSummary {
                    id: c.id,
                    other_user_id,
                    last_message_content: c.last_message_content,
                    last_message_at: c.last_message_at,
                    unread_count,
                }
            })
            .collect())
    }

    /// Message history, oldest first. Only participants may read it.
    pub async fn message_history(
        db: &Pool<Postgres>,
        conversation_id: Uuid,
        account_id: Uuid,
    ) -> Result<Vec<Message>, AppError> {
        let conversation = sqlx::query_as::<_, Conversation>(
            r#"
            SELECT id, user1_id, user2_id, last_message_content, last_message_at,
                   unread_count1, unread_count2, created_at
            FROM conversations
            WHERE id = $1
            "#,
        )
        .bind(conversation_id)
        .fetch_optional(db)
        .await?
        .ok_or(AppError::NotFound)?;

        if account_id != conversation.user1_id && account_id != conversation.user2_id {
            return Err(AppError::Forbidden);
        }

        let messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT id, conversation_id, sender_id, receiver_id, content, kind, created_at
            FROM messages
            WHERE conversation_id = $1
            ORDER BY created_at ASC
            LIMIT $2
            "#,
        )
        .bind(conversation_id)
        .bind(HISTORY_PAGE_LIMIT)
        .fetch_all(db)
        .await?;

        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_is_canonicalized_regardless_of_direction() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(canonical_pair(a, b), canonical_pair(b, a));
        let (first, second) = canonical_pair(a, b);
        assert!(first < second);
    }

    #[test]
    fn first_three_messages_are_free_the_fourth_is_not() {
        assert!(!fee_due(0));
        assert!(!fee_due(1));
        assert!(!fee_due(2));
        assert!(fee_due(3));
        assert!(fee_due(10));
        assert_eq!(MESSAGE_FEE, Decimal::ONE);
    }
}
