pub mod handlers;

use sqlx::PgExecutor;
use uuid::Uuid;

use crate::models::notification::NotificationKind;

/// Queues an in-app notification for `user_id`.
pub async fn notify<'e>(
    executor: impl PgExecutor<'e>,
    user_id: Uuid,
    kind: NotificationKind,
    title: &str,
    message: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO notifications (user_id, kind, title, message) VALUES ($1, $2, $3, $4)")
        .bind(user_id)
        .bind(kind)
        .bind(title)
        .bind(message)
        .execute(executor)
        .await?;
    Ok(())
}
