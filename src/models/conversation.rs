use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Direct conversation between a canonical pair of accounts: `user1_id` is
/// always the smaller id, so one row exists per pair.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Conversation {
    pub id: Uuid,
    pub user1_id: Uuid,
    pub user2_id: Uuid,
    pub last_message_content: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub unread_count1: i32,
    pub unread_count2: i32,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    /// Unread counter belonging to the given participant.
    pub fn unread_count_for(&self, account_id: Uuid) -> i32 {
        if account_id == self.user1_id {
            self.unread_count1
        } else {
            self.unread_count2
        }
    }
}

/// One row of a user's conversation list.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    pub id: Uuid,
    pub other_user_id: Uuid,
    pub last_message_content: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub unread_count: i32,
}
