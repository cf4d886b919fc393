use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "account_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum AccountStatus {
    Normal,
    Banned,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Normal => "NORMAL",
            AccountStatus::Banned => "BANNED",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "NORMAL" => Some(AccountStatus::Normal),
            "BANNED" => Some(AccountStatus::Banned),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "account_role", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum AccountRole {
    User,
    Admin,
}

/// A user account as the ledger sees it. Rows are never deleted; the balance
/// is only mutated through wallet operations and the status only through
/// moderation.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    pub id: Uuid,
    pub nickname: String,
    pub balance: Decimal,
    pub status: AccountStatus,
    pub role: AccountRole,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_db_strings() {
        assert_eq!(
            AccountStatus::from_db(AccountStatus::Banned.as_str()),
            Some(AccountStatus::Banned)
        );
        assert_eq!(AccountStatus::from_db("SUSPENDED"), None);
    }
}
