pub mod chat_service;
pub mod moderation_service;
pub mod wallet_service;

use sqlx::Postgres;
use uuid::Uuid;

/// Append an audit entry inside the caller's transaction so it commits (or
/// rolls back) together with the writes it describes.
pub(crate) async fn append_audit(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    actor_id: Uuid,
    action: &str,
    target: &str,
    details: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO audit_log (id, actor_id, action, target, details, created_at)
        VALUES ($1, $2, $3, $4, $5, NOW())
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(actor_id)
    .bind(action)
    .bind(target)
    .bind(details)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
