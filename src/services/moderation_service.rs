use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::cache::status_cache;
use crate::error::AppError;
use crate::models::{
    Account, AccountStatus, Comment, Post, Report, ReportStatus, ReportTargetKind,
    ReportWithTarget, ReportedContent,
};
use crate::redis_client::RedisClient;

pub struct ModerationService;

impl ModerationService {
    /// File a report against a post, user or comment.
    pub async fn create_report(
        db: &Pool<Postgres>,
        reporter_id: Uuid,
        target_kind: ReportTargetKind,
        target_id: Uuid,
        reason: &str,
    ) -> Result<Report, AppError> {
        let exists: bool = match target_kind {
            ReportTargetKind::Post => {
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM posts WHERE id = $1)")
                    .bind(target_id)
                    .fetch_one(db)
                    .await?
            }
            ReportTargetKind::User => {
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM accounts WHERE id = $1)")
                    .bind(target_id)
                    .fetch_one(db)
                    .await?
            }
            ReportTargetKind::Comment => {
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM comments WHERE id = $1)")
                    .bind(target_id)
                    .fetch_one(db)
                    .await?
            }
        };
        if !exists {
            return Err(AppError::NotFound);
        }

        let report = sqlx::query_as::<_, Report>(
            r#"
            INSERT INTO reports (id, reporter_id, target_kind, target_id, reason, status, created_at)
            VALUES ($1, $2, $3, $4, $5, 'PENDING', NOW())
            RETURNING id, reporter_id, target_kind, target_id, reason, status, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(reporter_id)
        .bind(target_kind)
        .bind(target_id)
        .bind(reason)
        .fetch_one(db)
        .await?;

        tracing::info!(
            report_id = %report.id,
            reporter_id = %reporter_id,
            target_kind = %target_kind.as_str(),
            target_id = %target_id,
            "report created"
        );

        Ok(report)
    }

    /// Admin queue, newest first, each report enriched with its target.
    pub async fn list_reports(
        db: &Pool<Postgres>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ReportWithTarget>, AppError> {
        let reports = sqlx::query_as::<_, Report>(
            r#"
            SELECT id, reporter_id, target_kind, target_id, reason, status, created_at
            FROM reports
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;

        let mut enriched = Vec::with_capacity(reports.len());
        for report in reports {
            let target = Self::resolve_target(db, report.target_kind, report.target_id).await?;
            enriched.push(ReportWithTarget { report, target });
        }

        Ok(enriched)
    }

    async fn resolve_target(
        db: &Pool<Postgres>,
        kind: ReportTargetKind,
        target_id: Uuid,
    ) -> Result<Option<ReportedContent>, AppError> {
        let content = match kind {
            ReportTargetKind::Post => sqlx::query_as::<_, Post>(
                "SELECT id, author_id, content, is_deleted, created_at FROM posts WHERE id = $1",
            )
            .bind(target_id)
            .fetch_optional(db)
            .await?
            .map(|p| ReportedContent::Post {
                id: p.id,
                author_id: p.author_id,
                content: p.content,
                is_deleted: p.is_deleted,
            }),
            ReportTargetKind::User => sqlx::query_as::<_, Account>(
                r#"
                SELECT id, nickname, balance, status, role, created_at
                FROM accounts
                WHERE id = $1
                "#,
            )
            .bind(target_id)
            .fetch_optional(db)
            .await?
            .map(|a| ReportedContent::User {
                id: a.id,
                nickname: a.nickname,
                status: a.status,
            }),
            ReportTargetKind::Comment => sqlx::query_as::<_, Comment>(
                r#"
                SELECT id, post_id, author_id, content, is_deleted, created_at
                FROM comments
                WHERE id = $1
                "#,
            )
            .bind(target_id)
            .fetch_optional(db)
            .await?
            .map(|c| ReportedContent::Comment {
                id: c.id,
                post_id: c.post_id,
                content: c.content,
                is_deleted: c.is_deleted,
            }),
        };

        Ok(content)
    }

    /// Resolve a PENDING report. Status flip, audit entry and the resulting
    /// enforcement (post/comment takedown or account ban) commit as one
    /// transaction; the status-cache overwrite for a ban runs after the
    /// commit and never rolls it back.
    pub async fn process_report(
        db: &Pool<Postgres>,
        redis: &RedisClient,
        cache_ttl_secs: u64,
        admin_id: Uuid,
        report_id: Uuid,
        accepted: bool,
        details: Option<&str>,
    ) -> Result<(), AppError> {
        let report = sqlx::query_as::<_, Report>(
            r#"
            SELECT id, reporter_id, target_kind, target_id, reason, status, created_at
            FROM reports
            WHERE id = $1
            "#,
        )
        .bind(report_id)
        .fetch_optional(db)
        .await?
        .ok_or(AppError::NotFound)?;

        if report.status != ReportStatus::Pending {
            return Err(AppError::AlreadyProcessed);
        }

        let new_status = if accepted {
            ReportStatus::Accepted
        } else {
            ReportStatus::Rejected
        };

        let mut tx = db.begin().await?;

        // Conditional on PENDING: a concurrent admin processing the same
        // report loses here instead of double-writing the audit trail.
        let flipped = sqlx::query("UPDATE reports SET status = $1 WHERE id = $2 AND status = 'PENDING'")
            .bind(new_status)
            .bind(report_id)
            .execute(&mut *tx)
            .await?;
        if flipped.rows_affected() == 0 {
            return Err(AppError::AlreadyProcessed);
        }

        let action = if accepted {
            "REPORT_ACCEPTED"
        } else {
            "REPORT_REJECTED"
        };
        let generated;
        let details = match details {
            Some(d) => d,
            None => {
                generated = format!(
                    "ContentType: {}, ContentId: {}",
                    report.target_kind.as_str(),
                    report.target_id
                );
                &generated
            }
        };
        super::append_audit(&mut tx, admin_id, action, &format!("Report:{report_id}"), details)
            .await?;

        if accepted {
            match report.target_kind {
                ReportTargetKind::Post => {
                    sqlx::query("UPDATE posts SET is_deleted = TRUE WHERE id = $1")
                        .bind(report.target_id)
                        .execute(&mut *tx)
                        .await?;
                }
                ReportTargetKind::User => {
                    sqlx::query("UPDATE accounts SET status = 'BANNED' WHERE id = $1")
                        .bind(report.target_id)
                        .execute(&mut *tx)
                        .await?;
                }
                ReportTargetKind::Comment => {
                    sqlx::query("UPDATE comments SET is_deleted = TRUE WHERE id = $1")
                        .bind(report.target_id)
                        .execute(&mut *tx)
                        .await?;
                }
            }
        }

        tx.commit().await?;

        tracing::info!(
            report_id = %report_id,
            admin_id = %admin_id,
            accepted,
            target_kind = %report.target_kind.as_str(),
            "report processed"
        );

        if accepted && report.target_kind == ReportTargetKind::User {
            // Best-effort, post-commit: the next ban check must see BANNED
            // without waiting out the TTL. The primary store already holds
            // the truth, so a cache failure is logged, not propagated.
            let banned = report.target_id;
            if let Err(e) =
                status_cache::overwrite_status(redis, banned, AccountStatus::Banned, cache_ttl_secs)
                    .await
            {
                tracing::warn!(error = %e, account_id = %banned, "status cache overwrite failed; retrying");
                if let Err(e) = status_cache::overwrite_status(
                    redis,
                    banned,
                    AccountStatus::Banned,
                    cache_ttl_secs,
                )
                .await
                {
                    tracing::error!(
                        error = %e,
                        account_id = %banned,
                        "status cache overwrite failed; stale entry persists until TTL expiry"
                    );
                }
            }
        }

        Ok(())
    }
}
