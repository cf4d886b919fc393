mod common;

use common::*;
use ledger_service::error::AppError;
use ledger_service::models::{TransactionKind, TransactionStatus};
use ledger_service::services::wallet_service::{
    sign_out_trade_no, CallbackAck, WalletService,
};
use rust_decimal::Decimal;

const CALLBACK_SECRET: &str = "test-callback-secret";
const GATEWAY_URL: &str = "https://pay.example.com/pay";

fn dec(units: i64, scale: u32) -> Decimal {
    Decimal::new(units, scale)
}

#[tokio::test]
async fn consume_decrements_balance_and_records_negative_entry() {
    let db = start_db().await;
    let account = create_account(&db.pool, "alice", dec(1000, 2)).await;

    let txn = WalletService::consume(
        &db.pool,
        account,
        Decimal::ONE,
        TransactionKind::Consume,
        Some("test consume"),
    )
    .await
    .expect("consume succeeds");

    assert_eq!(txn.amount, dec(-100, 2));
    assert_eq!(txn.kind, TransactionKind::Consume);
    assert_eq!(txn.status, TransactionStatus::Completed);
    assert_eq!(txn.remark.as_deref(), Some("test consume"));

    let balance = account_balance(&db.pool, account).await;
    assert_eq!(balance, dec(900, 2));
    // Ledger invariant: seeded balance plus completed entries equals balance.
    assert_eq!(dec(1000, 2) + completed_sum(&db.pool, account).await, balance);
}

#[tokio::test]
async fn consume_with_insufficient_balance_writes_nothing() {
    let db = start_db().await;
    let account = create_account(&db.pool, "bob", dec(50, 2)).await;

    let err = WalletService::consume(
        &db.pool,
        account,
        Decimal::ONE,
        TransactionKind::Consume,
        None,
    )
    .await
    .expect_err("balance is too low");
    assert!(matches!(err, AppError::InsufficientBalance));

    assert_eq!(account_balance(&db.pool, account).await, dec(50, 2));
    assert_eq!(completed_sum(&db.pool, account).await, Decimal::ZERO);
}

#[tokio::test]
async fn consume_rejects_non_positive_amounts() {
    let db = start_db().await;
    let account = create_account(&db.pool, "carol", dec(1000, 2)).await;

    for amount in [Decimal::ZERO, dec(-100, 2)] {
        let err = WalletService::consume(
            &db.pool,
            account,
            amount,
            TransactionKind::Consume,
            None,
        )
        .await
        .expect_err("non-positive amount");
        assert!(matches!(err, AppError::InvalidAmount));
    }
    assert_eq!(account_balance(&db.pool, account).await, dec(1000, 2));
}

#[tokio::test]
async fn concurrent_consumes_of_the_last_unit_yield_one_winner() {
    let db = start_db().await;
    let account = create_account(&db.pool, "dave", Decimal::ONE).await;

    let first = WalletService::consume(
        &db.pool,
        account,
        Decimal::ONE,
        TransactionKind::Consume,
        None,
    );
    let second = WalletService::consume(
        &db.pool,
        account,
        Decimal::ONE,
        TransactionKind::Consume,
        None,
    );
    let (r1, r2) = tokio::join!(first, second);

    let successes = [&r1, &r2].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one concurrent consume may win");
    let failure = if r1.is_err() { r1 } else { r2 };
    assert!(matches!(
        failure.expect_err("the loser"),
        AppError::InsufficientBalance
    ));

    assert_eq!(account_balance(&db.pool, account).await, Decimal::ZERO);
    assert_eq!(Decimal::ONE + completed_sum(&db.pool, account).await, Decimal::ZERO);
}

#[tokio::test]
async fn recharge_callback_credits_balance_exactly_once() {
    let db = start_db().await;
    let account = create_account(&db.pool, "erin", Decimal::ZERO).await;

    let order = WalletService::create_recharge_order(
        &db.pool,
        CALLBACK_SECRET,
        GATEWAY_URL,
        account,
        dec(5000, 2),
        None,
    )
    .await
    .expect("order created");

    assert!(order.out_trade_no.starts_with("PAY"));
    assert!(order.payment_url.starts_with(GATEWAY_URL));
    // Order creation must not touch the balance.
    assert_eq!(account_balance(&db.pool, account).await, Decimal::ZERO);

    let sign = sign_out_trade_no(CALLBACK_SECRET, &order.out_trade_no);
    let ack = WalletService::apply_recharge_callback(
        &db.pool,
        CALLBACK_SECRET,
        &order.out_trade_no,
        &sign,
    )
    .await
    .expect("callback applies");
    assert_eq!(ack, CallbackAck::Applied);

    assert_eq!(account_balance(&db.pool, account).await, dec(5000, 2));
    assert_eq!(completed_sum(&db.pool, account).await, dec(5000, 2));
    assert_eq!(audit_count(&db.pool, "RECHARGE_SUCCESS").await, 1);

    let status: TransactionStatus =
        sqlx::query_scalar("SELECT status FROM coin_transactions WHERE id = $1")
            .bind(order.transaction_id)
            .fetch_one(&db.pool)
            .await
            .unwrap();
    assert_eq!(status, TransactionStatus::Completed);

    // At-least-once delivery: the replay acks without crediting again.
    let replay = WalletService::apply_recharge_callback(
        &db.pool,
        CALLBACK_SECRET,
        &order.out_trade_no,
        &sign,
    )
    .await
    .expect("replay is a success path");
    assert_eq!(replay, CallbackAck::AlreadyProcessed);
    assert_eq!(account_balance(&db.pool, account).await, dec(5000, 2));
    assert_eq!(audit_count(&db.pool, "RECHARGE_SUCCESS").await, 1);
}

#[tokio::test]
async fn callback_with_bad_signature_is_rejected_without_mutation() {
    let db = start_db().await;
    let account = create_account(&db.pool, "frank", Decimal::ZERO).await;

    let order = WalletService::create_recharge_order(
        &db.pool,
        CALLBACK_SECRET,
        GATEWAY_URL,
        account,
        dec(1000, 2),
        None,
    )
    .await
    .unwrap();

    let forged = sign_out_trade_no("wrong-secret", &order.out_trade_no);
    let err = WalletService::apply_recharge_callback(
        &db.pool,
        CALLBACK_SECRET,
        &order.out_trade_no,
        &forged,
    )
    .await
    .expect_err("forged signature");
    assert!(matches!(err, AppError::InvalidSignature));

    assert_eq!(account_balance(&db.pool, account).await, Decimal::ZERO);
    let status: TransactionStatus =
        sqlx::query_scalar("SELECT status FROM coin_transactions WHERE id = $1")
            .bind(order.transaction_id)
            .fetch_one(&db.pool)
            .await
            .unwrap();
    assert_eq!(status, TransactionStatus::Pending);
}

#[tokio::test]
async fn callback_for_unknown_order_is_rejected() {
    let db = start_db().await;

    let token = "PAYdoesnotexist";
    let sign = sign_out_trade_no(CALLBACK_SECRET, token);
    let err = WalletService::apply_recharge_callback(&db.pool, CALLBACK_SECRET, token, &sign)
        .await
        .expect_err("no such order");
    assert!(matches!(err, AppError::OrderNotFound));
}

#[tokio::test]
async fn balance_summary_lists_recent_transactions() {
    let db = start_db().await;
    let account = create_account(&db.pool, "grace", dec(1000, 2)).await;

    for _ in 0..3 {
        WalletService::consume(
            &db.pool,
            account,
            Decimal::ONE,
            TransactionKind::Consume,
            None,
        )
        .await
        .unwrap();
    }

    let summary = WalletService::get_balance(&db.pool, account).await.unwrap();
    assert_eq!(summary.balance, dec(700, 2));
    assert_eq!(summary.transactions.len(), 3);
    assert!(summary.transactions.iter().all(|t| t.amount == dec(-100, 2)));
}
