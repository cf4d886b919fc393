use sqlx::{Pool, Postgres};

// Embed SQL migrations at compile time for deterministic startup
const MIG_0001: &str = include_str!("../migrations/0001_create_accounts.sql");
const MIG_0002: &str = include_str!("../migrations/0002_create_coin_transactions.sql");
const MIG_0003: &str = include_str!("../migrations/0003_create_conversations.sql");
const MIG_0004: &str = include_str!("../migrations/0004_create_messages.sql");
const MIG_0005: &str = include_str!("../migrations/0005_create_posts_and_comments.sql");
const MIG_0006: &str = include_str!("../migrations/0006_create_reports.sql");
const MIG_0007: &str = include_str!("../migrations/0007_create_audit_log.sql");

pub async fn run_all(db: &Pool<Postgres>) -> Result<(), sqlx::Error> {
    let migrations = [
        MIG_0001, MIG_0002, MIG_0003, MIG_0004, MIG_0005, MIG_0006, MIG_0007,
    ];
    for (i, sql) in migrations.into_iter().enumerate() {
        let label = i + 1;
        // CREATE TYPE has no IF NOT EXISTS; on an already-migrated database the
        // statement fails and the rest of the file was applied on a prior run.
        match sqlx::raw_sql(sql).execute(db).await {
            Ok(_) => tracing::info!(migration = %label, "ledger-service migration applied"),
            Err(e) => {
                tracing::warn!(migration = %label, error = %e, "migration may have been applied already")
            }
        }
    }
    Ok(())
}
