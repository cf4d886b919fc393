use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use serde::Serialize;
use sha2::Sha256;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{CoinTransaction, TransactionKind};

type HmacSha256 = Hmac<Sha256>;

const RECENT_TRANSACTIONS_LIMIT: i64 = 20;

#[derive(Debug, Clone, Serialize)]
pub struct WalletSummary {
    pub balance: Decimal,
    pub transactions: Vec<CoinTransaction>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RechargeOrder {
    pub transaction_id: Uuid,
    pub out_trade_no: String,
    pub payment_url: String,
}

/// Outcome of a recharge callback. A replayed delivery is a success, not an
/// error: the gateway delivers at-least-once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAck {
    Applied,
    AlreadyProcessed,
}

/// Keyed hash over the order token; the gateway echoes it back in the
/// callback as `sign`.
pub fn sign_out_trade_no(secret: &str, out_trade_no: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(out_trade_no.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time verification of a callback signature.
pub fn verify_callback_signature(secret: &str, out_trade_no: &str, sign: &str) -> bool {
    let Ok(raw) = hex::decode(sign) else {
        return false;
    };
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(out_trade_no.as_bytes());
    mac.verify_slice(&raw).is_ok()
}

fn validated_amount(amount: Decimal) -> Result<Decimal, AppError> {
    let amount = amount.round_dp(2);
    if amount <= Decimal::ZERO {
        return Err(AppError::InvalidAmount);
    }
    Ok(amount)
}

pub struct WalletService;

impl WalletService {
    /// Debit `amount` from the account and record a COMPLETED ledger entry,
    /// as one transaction.
    ///
    /// The decrement is conditional on `balance >= amount`; zero affected
    /// rows means the balance cannot cover the debit and nothing is written.
    /// The WHERE clause is the serialization point: of two concurrent
    /// consumes racing over the last unit, exactly one row-matches.
    pub async fn consume(
        db: &Pool<Postgres>,
        account_id: Uuid,
        amount: Decimal,
        kind: TransactionKind,
        remark: Option<&str>,
    ) -> Result<CoinTransaction, AppError> {
        let amount = validated_amount(amount)?;

        let mut tx = db.begin().await?;

        let updated = sqlx::query(
            "UPDATE accounts SET balance = balance - $1 WHERE id = $2 AND balance >= $1",
        )
        .bind(amount)
        .bind(account_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            // Dropping the transaction rolls it back; no partial write.
            return Err(AppError::InsufficientBalance);
        }

        let transaction = sqlx::query_as::<_, CoinTransaction>(
            r#"
            INSERT INTO coin_transactions (id, account_id, amount, kind, status, remark, created_at)
            VALUES ($1, $2, $3, $4, 'COMPLETED', $5, NOW())
            RETURNING id, account_id, amount, kind, status, out_trade_no, remark, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(account_id)
        .bind(-amount)
        .bind(kind)
        .bind(remark)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            account_id = %account_id,
            amount = %amount,
            transaction_id = %transaction.id,
            "balance consumed"
        );

        Ok(transaction)
    }

    /// Create a PENDING recharge order and the signed redirect for the
    /// payment gateway. Balance is untouched until the callback arrives.
    pub async fn create_recharge_order(
        db: &Pool<Postgres>,
        callback_secret: &str,
        gateway_url: &str,
        account_id: Uuid,
        amount: Decimal,
        remark: Option<&str>,
    ) -> Result<RechargeOrder, AppError> {
        let amount = validated_amount(amount)?;

        let out_trade_no = format!("PAY{}", Uuid::new_v4().simple());
        let sign = sign_out_trade_no(callback_secret, &out_trade_no);

        let transaction_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO coin_transactions (id, account_id, amount, kind, status, out_trade_no, remark, created_at)
            VALUES ($1, $2, $3, 'RECHARGE', 'PENDING', $4, $5, NOW())
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(account_id)
        .bind(amount)
        .bind(&out_trade_no)
        .bind(remark.unwrap_or("user recharge"))
        .fetch_one(db)
        .await?;

        let payment_url = format!(
            "{}?out_trade_no={}&amount={}&sign={}",
            gateway_url, out_trade_no, amount, sign
        );

        tracing::info!(
            account_id = %account_id,
            transaction_id = %transaction_id,
            out_trade_no = %out_trade_no,
            "recharge order created"
        );

        Ok(RechargeOrder {
            transaction_id,
            out_trade_no,
            payment_url,
        })
    }

    /// Apply a payment-gateway callback: mark the order COMPLETED, credit the
    /// balance and append the audit entry, all in one transaction.
    ///
    /// Replayed deliveries ack without writing. The status flip is itself
    /// conditional so that two concurrent deliveries of the same callback
    /// credit the balance exactly once.
    pub async fn apply_recharge_callback(
        db: &Pool<Postgres>,
        callback_secret: &str,
        out_trade_no: &str,
        sign: &str,
    ) -> Result<CallbackAck, AppError> {
        if !verify_callback_signature(callback_secret, out_trade_no, sign) {
            tracing::warn!(out_trade_no = %out_trade_no, "invalid callback signature");
            return Err(AppError::InvalidSignature);
        }

        let transaction = sqlx::query_as::<_, CoinTransaction>(
            r#"
            SELECT id, account_id, amount, kind, status, out_trade_no, remark, created_at
            FROM coin_transactions
            WHERE out_trade_no = $1
            "#,
        )
        .bind(out_trade_no)
        .fetch_optional(db)
        .await?
        .ok_or(AppError::OrderNotFound)?;

        if transaction.status == crate::models::TransactionStatus::Completed {
            return Ok(CallbackAck::AlreadyProcessed);
        }

        let mut tx = db.begin().await?;

        let flipped = sqlx::query(
            "UPDATE coin_transactions SET status = 'COMPLETED' WHERE id = $1 AND status = 'PENDING'",
        )
        .bind(transaction.id)
        .execute(&mut *tx)
        .await?;

        if flipped.rows_affected() == 0 {
            // A concurrent delivery completed the order between our read and
            // this update.
            return Ok(CallbackAck::AlreadyProcessed);
        }

        sqlx::query("UPDATE accounts SET balance = balance + $1 WHERE id = $2")
            .bind(transaction.amount)
            .bind(transaction.account_id)
            .execute(&mut *tx)
            .await?;

        super::append_audit(
            &mut tx,
            transaction.account_id,
            "RECHARGE_SUCCESS",
            &format!("Transaction:{}", transaction.id),
            &format!(
                "Amount: {}, OutTradeNo: {}",
                transaction.amount, out_trade_no
            ),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            account_id = %transaction.account_id,
            transaction_id = %transaction.id,
            amount = %transaction.amount,
            "recharge applied"
        );

        Ok(CallbackAck::Applied)
    }

    /// Current balance plus the most recent ledger entries.
    pub async fn get_balance(
        db: &Pool<Postgres>,
        account_id: Uuid,
    ) -> Result<WalletSummary, AppError> {
        let balance: Decimal = sqlx::query_scalar("SELECT balance FROM accounts WHERE id = $1")
            .bind(account_id)
            .fetch_optional(db)
            .await?
            .ok_or(AppError::NotFound)?;

        let transactions = sqlx::query_as::<_, CoinTransaction>(
            r#"
            SELECT id, account_id, amount, kind, status, out_trade_no, remark, created_at
            FROM coin_transactions
            WHERE account_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(account_id)
        .bind(RECENT_TRANSACTIONS_LIMIT)
        .fetch_all(db)
        .await?;

        Ok(WalletSummary {
            balance,
            transactions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_round_trips() {
        let sign = sign_out_trade_no("secret", "PAYabc123");
        assert!(verify_callback_signature("secret", "PAYabc123", &sign));
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let sign = sign_out_trade_no("secret", "PAYabc123");
        assert!(!verify_callback_signature("secret", "PAYother", &sign));
        assert!(!verify_callback_signature("other-secret", "PAYabc123", &sign));
        assert!(!verify_callback_signature("secret", "PAYabc123", "not-hex"));
    }

    #[test]
    fn amounts_must_be_positive() {
        assert!(matches!(
            validated_amount(Decimal::ZERO),
            Err(AppError::InvalidAmount)
        ));
        assert!(matches!(
            validated_amount(Decimal::new(-100, 2)),
            Err(AppError::InvalidAmount)
        ));
        assert_eq!(
            validated_amount(Decimal::new(1005, 3)).unwrap(),
            Decimal::new(100, 2)
        );
    }
}
