//! Read-through projection of `accounts.status`.
//!
//! The primary store is authoritative; the cache only shortens the ban-check
//! path that every authorized request takes. Writers that change a status
//! must overwrite the entry instead of waiting for the TTL.

use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::AccountStatus;
use crate::redis_client::RedisClient;

fn status_key(account_id: Uuid) -> String {
    format!("ledger:cache:account:status:{}", account_id)
}

/// Cached status lookup. Cache misses (and cache failures) fall back to the
/// account store and repopulate the entry with the given TTL.
pub async fn get_status(
    redis: &RedisClient,
    db: &Pool<Postgres>,
    account_id: Uuid,
    ttl_secs: u64,
) -> Result<AccountStatus, AppError> {
    let key = status_key(account_id);
    let mut conn = redis.connection().await;

    match redis::cmd("GET")
        .arg(&key)
        .query_async::<_, Option<String>>(&mut conn)
        .await
    {
        Ok(Some(cached)) => {
            if let Some(status) = AccountStatus::from_db(&cached) {
                return Ok(status);
            }
        }
        Ok(None) => {}
        Err(e) => {
            tracing::warn!(error = %e, account_id = %account_id, "status cache read failed; falling back to store");
        }
    }

    let status: AccountStatus = sqlx::query_scalar("SELECT status FROM accounts WHERE id = $1")
        .bind(account_id)
        .fetch_optional(db)
        .await?
        .ok_or(AppError::NotFound)?;

    if let Err(e) = redis::cmd("SET")
        .arg(&key)
        .arg(status.as_str())
        .arg("EX")
        .arg(ttl_secs)
        .query_async::<_, ()>(&mut conn)
        .await
    {
        tracing::warn!(error = %e, account_id = %account_id, "status cache populate failed");
    }

    Ok(status)
}

/// Unconditionally overwrite the cached entry. Used after a status write to
/// the primary store so a stale read-through cannot repopulate the old value.
pub async fn overwrite_status(
    redis: &RedisClient,
    account_id: Uuid,
    status: AccountStatus,
    ttl_secs: u64,
) -> Result<(), redis::RedisError> {
    let key = status_key(account_id);
    let mut conn = redis.connection().await;
    redis::cmd("SET")
        .arg(&key)
        .arg(status.as_str())
        .arg("EX")
        .arg(ttl_secs)
        .query_async::<_, ()>(&mut conn)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_scoped_per_account() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_ne!(status_key(a), status_key(b));
        assert!(status_key(a).starts_with("ledger:cache:account:status:"));
    }
}
