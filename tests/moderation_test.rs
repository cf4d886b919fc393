mod common;

use common::*;
use ledger_service::cache::status_cache;
use ledger_service::error::AppError;
use ledger_service::models::{AccountStatus, ReportStatus, ReportTargetKind, ReportedContent};
use ledger_service::services::moderation_service::ModerationService;
use rust_decimal::Decimal;
use uuid::Uuid;

const CACHE_TTL: u64 = 3600;

#[tokio::test]
async fn accepted_user_report_bans_the_account_and_the_cache_sees_it_immediately() {
    let db = start_db().await;
    let redis = start_redis().await;
    let admin = create_admin(&db.pool, "admin").await;
    let reporter = create_account(&db.pool, "reporter", Decimal::ZERO).await;
    let target = create_account(&db.pool, "troll", Decimal::ZERO).await;

    // Warm the cache with NORMAL so the test proves the overwrite, not a miss.
    let status = status_cache::get_status(&redis.client, &db.pool, target, CACHE_TTL)
        .await
        .unwrap();
    assert_eq!(status, AccountStatus::Normal);

    let report = ModerationService::create_report(
        &db.pool,
        reporter,
        ReportTargetKind::User,
        target,
        "abusive messages",
    )
    .await
    .unwrap();
    assert_eq!(report.status, ReportStatus::Pending);

    ModerationService::process_report(
        &db.pool,
        &redis.client,
        CACHE_TTL,
        admin,
        report.id,
        true,
        None,
    )
    .await
    .unwrap();

    let db_status: AccountStatus =
        sqlx::query_scalar("SELECT status FROM accounts WHERE id = $1")
            .bind(target)
            .fetch_one(&db.pool)
            .await
            .unwrap();
    assert_eq!(db_status, AccountStatus::Banned);

    // The warmed NORMAL entry has not expired, yet the ban is visible.
    let cached = status_cache::get_status(&redis.client, &db.pool, target, CACHE_TTL)
        .await
        .unwrap();
    assert_eq!(cached, AccountStatus::Banned);

    assert_eq!(audit_count(&db.pool, "REPORT_ACCEPTED").await, 1);
}

#[tokio::test]
async fn reprocessing_a_report_fails_without_a_second_audit_entry() {
    let db = start_db().await;
    let redis = start_redis().await;
    let admin = create_admin(&db.pool, "admin").await;
    let reporter = create_account(&db.pool, "reporter", Decimal::ZERO).await;
    let target = create_account(&db.pool, "troll", Decimal::ZERO).await;

    let report = ModerationService::create_report(
        &db.pool,
        reporter,
        ReportTargetKind::User,
        target,
        "spam",
    )
    .await
    .unwrap();

    ModerationService::process_report(
        &db.pool,
        &redis.client,
        CACHE_TTL,
        admin,
        report.id,
        true,
        None,
    )
    .await
    .unwrap();

    let err = ModerationService::process_report(
        &db.pool,
        &redis.client,
        CACHE_TTL,
        admin,
        report.id,
        false,
        None,
    )
    .await
    .expect_err("terminal state");
    assert!(matches!(err, AppError::AlreadyProcessed));

    assert_eq!(audit_count(&db.pool, "REPORT_ACCEPTED").await, 1);
    assert_eq!(audit_count(&db.pool, "REPORT_REJECTED").await, 0);
}

#[tokio::test]
async fn accepted_post_report_soft_deletes_the_post() {
    let db = start_db().await;
    let redis = start_redis().await;
    let admin = create_admin(&db.pool, "admin").await;
    let author = create_account(&db.pool, "author", Decimal::ZERO).await;
    let reporter = create_account(&db.pool, "reporter", Decimal::ZERO).await;
    let post = create_post(&db.pool, author, "questionable content").await;

    let report = ModerationService::create_report(
        &db.pool,
        reporter,
        ReportTargetKind::Post,
        post,
        "inappropriate",
    )
    .await
    .unwrap();

    ModerationService::process_report(
        &db.pool,
        &redis.client,
        CACHE_TTL,
        admin,
        report.id,
        true,
        Some("confirmed after review"),
    )
    .await
    .unwrap();

    let is_deleted: bool = sqlx::query_scalar("SELECT is_deleted FROM posts WHERE id = $1")
        .bind(post)
        .fetch_one(&db.pool)
        .await
        .unwrap();
    assert!(is_deleted, "takedown is a visibility flag");

    // Soft deletion: the row itself survives.
    let author_status: AccountStatus =
        sqlx::query_scalar("SELECT status FROM accounts WHERE id = $1")
            .bind(author)
            .fetch_one(&db.pool)
            .await
            .unwrap();
    assert_eq!(author_status, AccountStatus::Normal);
}

#[tokio::test]
async fn rejected_report_leaves_the_target_untouched() {
    let db = start_db().await;
    let redis = start_redis().await;
    let admin = create_admin(&db.pool, "admin").await;
    let reporter = create_account(&db.pool, "reporter", Decimal::ZERO).await;
    let target = create_account(&db.pool, "innocent", Decimal::ZERO).await;

    let report = ModerationService::create_report(
        &db.pool,
        reporter,
        ReportTargetKind::User,
        target,
        "looked suspicious",
    )
    .await
    .unwrap();

    ModerationService::process_report(
        &db.pool,
        &redis.client,
        CACHE_TTL,
        admin,
        report.id,
        false,
        None,
    )
    .await
    .unwrap();

    let status: ReportStatus = sqlx::query_scalar("SELECT status FROM reports WHERE id = $1")
        .bind(report.id)
        .fetch_one(&db.pool)
        .await
        .unwrap();
    assert_eq!(status, ReportStatus::Rejected);

    let target_status: AccountStatus =
        sqlx::query_scalar("SELECT status FROM accounts WHERE id = $1")
            .bind(target)
            .fetch_one(&db.pool)
            .await
            .unwrap();
    assert_eq!(target_status, AccountStatus::Normal);
    assert_eq!(audit_count(&db.pool, "REPORT_REJECTED").await, 1);
}

#[tokio::test]
async fn unknown_report_and_unknown_target_are_not_found() {
    let db = start_db().await;
    let redis = start_redis().await;
    let admin = create_admin(&db.pool, "admin").await;
    let reporter = create_account(&db.pool, "reporter", Decimal::ZERO).await;

    let err = ModerationService::process_report(
        &db.pool,
        &redis.client,
        CACHE_TTL,
        admin,
        Uuid::new_v4(),
        true,
        None,
    )
    .await
    .expect_err("no such report");
    assert!(matches!(err, AppError::NotFound));

    let err = ModerationService::create_report(
        &db.pool,
        reporter,
        ReportTargetKind::Post,
        Uuid::new_v4(),
        "phantom",
    )
    .await
    .expect_err("no such post");
    assert!(matches!(err, AppError::NotFound));
}

#[tokio::test]
async fn admin_queue_resolves_targets_per_kind() {
    let db = start_db().await;
    let admin_author = create_account(&db.pool, "author", Decimal::ZERO).await;
    let reporter = create_account(&db.pool, "reporter", Decimal::ZERO).await;
    let troll = create_account(&db.pool, "troll", Decimal::ZERO).await;
    let post = create_post(&db.pool, admin_author, "spam post").await;

    ModerationService::create_report(&db.pool, reporter, ReportTargetKind::Post, post, "spam")
        .await
        .unwrap();
    ModerationService::create_report(&db.pool, reporter, ReportTargetKind::User, troll, "abuse")
        .await
        .unwrap();

    let queue = ModerationService::list_reports(&db.pool, 10, 0).await.unwrap();
    assert_eq!(queue.len(), 2);

    for entry in &queue {
        match entry.report.target_kind {
            ReportTargetKind::Post => {
                assert!(matches!(
                    entry.target,
                    Some(ReportedContent::Post { id, .. }) if id == post
                ));
            }
            ReportTargetKind::User => {
                assert!(matches!(
                    entry.target,
                    Some(ReportedContent::User { id, .. }) if id == troll
                ));
            }
            ReportTargetKind::Comment => unreachable!("no comment reports filed"),
        }
    }
}

#[tokio::test]
async fn read_through_cache_serves_stale_until_overwritten() {
    let db = start_db().await;
    let redis = start_redis().await;
    let account = create_account(&db.pool, "cached", Decimal::ZERO).await;

    // Miss populates the entry.
    let status = status_cache::get_status(&redis.client, &db.pool, account, CACHE_TTL)
        .await
        .unwrap();
    assert_eq!(status, AccountStatus::Normal);

    // A direct store write is invisible while the entry lives...
    sqlx::query("UPDATE accounts SET status = 'BANNED' WHERE id = $1")
        .bind(account)
        .execute(&db.pool)
        .await
        .unwrap();
    let stale = status_cache::get_status(&redis.client, &db.pool, account, CACHE_TTL)
        .await
        .unwrap();
    assert_eq!(stale, AccountStatus::Normal);

    // ...which is why status writers must overwrite, not wait for the TTL.
    status_cache::overwrite_status(&redis.client, account, AccountStatus::Banned, CACHE_TTL)
        .await
        .unwrap();
    let fresh = status_cache::get_status(&redis.client, &db.pool, account, CACHE_TTL)
        .await
        .unwrap();
    assert_eq!(fresh, AccountStatus::Banned);
}
