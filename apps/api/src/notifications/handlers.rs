use axum::{extract::State, http::StatusCode};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::extract::{Json, Path, Query};
use crate::models::notification::NotificationRow;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    pub unread: Option<bool>,
}

/// GET /api/notifications
pub async fn handle_list_notifications(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<NotificationQuery>,
) -> Result<Json<Vec<NotificationRow>>, AppError> {
    let rows = sqlx::query_as::<_, NotificationRow>(
        r#"
        SELECT * FROM notifications
        WHERE user_id = $1 AND ($2::BOOLEAN IS NULL OR read = NOT $2)
        ORDER BY created_at DESC
        "#,
    )
    .bind(user.user_id)
    .bind(params.unread)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(rows))
}

/// POST /api/notifications/:id/read
pub async fn handle_mark_read(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query("UPDATE notifications SET read = true WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user.user_id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Notification"));
    }
    Ok(StatusCode::NO_CONTENT)
}
