use axum::{extract::State, http::StatusCode};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::accounts::require_active_employee;
use crate::auth::extractor::STAFF;
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::extract::{Json, Path, Query};
use crate::leave::rules::{check_decision, spans_overlap, validate_span};
use crate::models::attendance::AttendanceStatus;
use crate::models::leave::{LeaveDetailRow, LeaveRow, LeaveStatus, LeaveType};
use crate::models::notification::NotificationKind;
use crate::models::user::Role;
use crate::notifications::notify;
use crate::state::AppState;
use crate::validation::require_text;

#[derive(Debug, Deserialize)]
pub struct ApplyLeaveRequest {
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct LeaveQuery {
    pub user_id: Option<Uuid>,
    pub status: Option<LeaveStatus>,
}

#[derive(Debug, Deserialize)]
pub struct DecideLeaveRequest {
    pub status: LeaveStatus,
}

/// POST /api/leave/apply
pub async fn handle_apply_leave(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<ApplyLeaveRequest>,
) -> Result<(StatusCode, Json<LeaveRow>), AppError> {
    user.require(&[Role::Employee])?;
    let reason = require_text("Reason", &req.reason)?;
    let days = validate_span(req.start_date, req.end_date, Utc::now().date_naive())?;

    require_active_employee(&state.db, user.user_id).await?;
    let active: Vec<(NaiveDate, NaiveDate)> = sqlx::query_as(
        "SELECT start_date, end_date FROM leaves
         WHERE user_id = $1 AND status IN ('Pending', 'Approved')",
    )
    .bind(user.user_id)
    .fetch_all(&state.db)
    .await?;
    if active
        .iter()
        .any(|span| spans_overlap(*span, (req.start_date, req.end_date)))
    {
        return Err(AppError::Conflict(
            "Leave overlaps an existing request".to_string(),
        ));
    }

    let row: LeaveRow = sqlx::query_as(
        r#"
        INSERT INTO leaves (user_id, leave_type, start_date, end_date, days, reason)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(user.user_id)
    .bind(req.leave_type)
    .bind(req.start_date)
    .bind(req.end_date)
    .bind(days)
    .bind(&reason)
    .fetch_one(&state.db)
    .await?;

    info!(
        user_id = %user.user_id,
        "Leave {} requested: {:?} for {} day(s)", row.id, row.leave_type, row.days
    );
    Ok((StatusCode::CREATED, Json(row)))
}

/// GET /api/leave/applications
pub async fn handle_list_leaves(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<LeaveQuery>,
) -> Result<Json<Vec<LeaveDetailRow>>, AppError> {
    user.require(STAFF)?;
    let rows = sqlx::query_as::<_, LeaveDetailRow>(
        r#"
        SELECT l.*, u.name AS employee_name, u.email AS employee_email
        FROM leaves l
        JOIN users u ON u.id = l.user_id
        WHERE ($1::UUID IS NULL OR l.user_id = $1)
          AND ($2::TEXT IS NULL OR l.status = $2)
        ORDER BY l.applied_at DESC
        "#,
    )
    .bind(params.user_id)
    .bind(params.status)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(rows))
}

/// GET /api/leave/mine
pub async fn handle_my_leaves(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<LeaveRow>>, AppError> {
    user.require(&[Role::Employee])?;
    let rows = sqlx::query_as::<_, LeaveRow>(
        "SELECT * FROM leaves WHERE user_id = $1 ORDER BY applied_at DESC",
    )
    .bind(user.user_id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(rows))
}

/// PUT /api/leave/:id
/// Approval also books every day of the span as `Leave` in attendance.
pub async fn handle_decide_leave(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<DecideLeaveRequest>,
) -> Result<Json<LeaveRow>, AppError> {
    user.require(STAFF)?;
    let mut tx = state.db.begin().await?;

    let existing: LeaveRow = sqlx::query_as("SELECT * FROM leaves WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("Leave request"))?;
    check_decision(existing.status, req.status)?;

    let row: LeaveRow = sqlx::query_as(
        r#"
        UPDATE leaves SET status = $1, approved_by = $2, decided_at = now()
        WHERE id = $3
        RETURNING *
        "#,
    )
    .bind(req.status)
    .bind(user.user_id)
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    if row.status == LeaveStatus::Approved {
        sqlx::query(
            r#"
            INSERT INTO attendance (user_id, attendance_date, status)
            SELECT $1, day::DATE, $4
            FROM generate_series($2::DATE, $3::DATE, INTERVAL '1 day') AS day
            ON CONFLICT (user_id, attendance_date) DO UPDATE SET status = EXCLUDED.status
            "#,
        )
        .bind(row.user_id)
        .bind(row.start_date)
        .bind(row.end_date)
        .bind(AttendanceStatus::Leave)
        .execute(&mut *tx)
        .await?;
    }

    let verdict = if row.status == LeaveStatus::Approved {
        "approved"
    } else {
        "rejected"
    };
    notify(
        &mut *tx,
        row.user_id,
        NotificationKind::Leave,
        "Leave request update",
        &format!(
            "Your leave from {} to {} was {verdict}.",
            row.start_date, row.end_date
        ),
    )
    .await?;
    tx.commit().await?;

    info!("Leave {id} {verdict} by {}", user.user_id);
    Ok(Json(row))
}

/// POST /api/leave/:id/cancel
pub async fn handle_cancel_leave(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<LeaveRow>, AppError> {
    user.require(&[Role::Employee])?;
    let existing: LeaveRow =
        sqlx::query_as("SELECT * FROM leaves WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user.user_id)
            .fetch_optional(&state.db)
            .await?
            .ok_or_else(|| AppError::not_found("Leave request"))?;
    if existing.status != LeaveStatus::Pending {
        return Err(AppError::InvalidTransition(format!(
            "only pending requests can be cancelled, this one is {:?}",
            existing.status
        )));
    }

    let row: LeaveRow = sqlx::query_as(
        "UPDATE leaves SET status = $1 WHERE id = $2 AND status = 'Pending' RETURNING *",
    )
    .bind(LeaveStatus::Cancelled)
    .bind(id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::Conflict("Leave request was decided meanwhile".to_string()))?;

    info!(user_id = %user.user_id, "Leave {id} cancelled");
    Ok(Json(row))
}
