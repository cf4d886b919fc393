use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_kind", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionKind {
    Recharge,
    Consume,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    Pending,
    Completed,
}

/// Immutable ledger entry. `amount` is signed: credits are positive, debits
/// negative. The only permitted mutation is the single PENDING -> COMPLETED
/// transition of a recharge order.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CoinTransaction {
    pub id: Uuid,
    pub account_id: Uuid,
    pub amount: Decimal,
    pub kind: TransactionKind,
    pub status: TransactionStatus,
    pub out_trade_no: Option<String>,
    pub remark: Option<String>,
    pub created_at: DateTime<Utc>,
}
