use axum::extract::State;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::attendance::summary::{summarize, AttendanceSummary};
use crate::auth::accounts::{require_active_employee, require_employee};
use crate::auth::extractor::STAFF;
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::extract::{Json, Query};
use crate::models::attendance::{AttendanceRow, AttendanceStatus};
use crate::models::user::Role;
use crate::state::AppState;
use crate::validation::Month;

#[derive(Debug, Deserialize)]
pub struct AttendanceQuery {
    pub user_id: Option<Uuid>,
    pub month: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MarkAttendanceRequest {
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
}

pub(crate) async fn list_records(
    pool: &sqlx::PgPool,
    user_id: Option<Uuid>,
    month: Option<Month>,
) -> Result<Vec<AttendanceRow>, AppError> {
    Ok(sqlx::query_as::<_, AttendanceRow>(
        r#"
        SELECT * FROM attendance
        WHERE ($1::UUID IS NULL OR user_id = $1)
          AND ($2::DATE IS NULL OR attendance_date >= $2)
          AND ($3::DATE IS NULL OR attendance_date <= $3)
        ORDER BY attendance_date DESC
        "#,
    )
    .bind(user_id)
    .bind(month.map(Month::first_day))
    .bind(month.map(Month::last_day))
    .fetch_all(pool)
    .await?)
}

fn parse_month(raw: Option<&str>) -> Result<Option<Month>, AppError> {
    raw.map(Month::parse).transpose()
}

/// Explains why today's row blocks a new check-in.
fn check_in_conflict(existing: &AttendanceRow) -> AppError {
    let message = match (existing.check_in, existing.status) {
        (Some(at), _) => format!("Already checked in today at {}", at.format("%H:%M")),
        (None, AttendanceStatus::Leave) => "Today is booked as leave".to_string(),
        (None, status) => format!("Today's attendance was already marked as {status:?}"),
    };
    AppError::Conflict(message)
}

/// POST /api/attendance/check-in
pub async fn handle_check_in(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<AttendanceRow>, AppError> {
    user.require(&[Role::Employee])?;
    let today = Utc::now().date_naive();

    require_active_employee(&state.db, user.user_id).await?;
    let existing: Option<AttendanceRow> =
        sqlx::query_as("SELECT * FROM attendance WHERE user_id = $1 AND attendance_date = $2")
            .bind(user.user_id)
            .bind(today)
            .fetch_optional(&state.db)
            .await?;
    if let Some(existing) = existing {
        return Err(check_in_conflict(&existing));
    }

    let row: AttendanceRow = sqlx::query_as(
        r#"
        INSERT INTO attendance (user_id, attendance_date, check_in, status)
        VALUES ($1, $2, now(), $3)
        RETURNING *
        "#,
    )
    .bind(user.user_id)
    .bind(today)
    .bind(AttendanceStatus::Present)
    .fetch_one(&state.db)
    .await
    .map_err(|e| AppError::on_unique_violation(e, "Already checked in today"))?;

    info!(user_id = %user.user_id, "Checked in for {today}");
    Ok(Json(row))
}

/// POST /api/attendance/check-out
pub async fn handle_check_out(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<AttendanceRow>, AppError> {
    user.require(&[Role::Employee])?;
    let today = Utc::now().date_naive();

    require_active_employee(&state.db, user.user_id).await?;
    let existing: Option<AttendanceRow> =
        sqlx::query_as("SELECT * FROM attendance WHERE user_id = $1 AND attendance_date = $2")
            .bind(user.user_id)
            .bind(today)
            .fetch_optional(&state.db)
            .await?;
    let existing = existing
        .filter(|r| r.check_in.is_some())
        .ok_or_else(|| AppError::Validation("No check-in recorded today".to_string()))?;
    if existing.check_out.is_some() {
        return Err(AppError::Conflict("Already checked out today".to_string()));
    }

    let row: AttendanceRow =
        sqlx::query_as("UPDATE attendance SET check_out = now() WHERE id = $1 RETURNING *")
            .bind(existing.id)
            .fetch_one(&state.db)
            .await?;

    info!(user_id = %user.user_id, "Checked out for {today}");
    Ok(Json(row))
}

/// POST /api/attendance/mark
pub async fn handle_mark_attendance(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<MarkAttendanceRequest>,
) -> Result<Json<AttendanceRow>, AppError> {
    user.require(STAFF)?;
    require_employee(&state.db, req.user_id).await?;

    let row: AttendanceRow = sqlx::query_as(
        r#"
        INSERT INTO attendance (user_id, attendance_date, status)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id, attendance_date) DO UPDATE SET status = EXCLUDED.status
        RETURNING *
        "#,
    )
    .bind(req.user_id)
    .bind(req.date)
    .bind(req.status)
    .fetch_one(&state.db)
    .await?;

    info!(
        "Attendance for {} on {} marked {:?} by {}",
        req.user_id, req.date, req.status, user.user_id
    );
    Ok(Json(row))
}

/// GET /api/attendance/records
pub async fn handle_list_records(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<AttendanceQuery>,
) -> Result<Json<Vec<AttendanceRow>>, AppError> {
    user.require(STAFF)?;
    let month = parse_month(params.month.as_deref())?;
    Ok(Json(list_records(&state.db, params.user_id, month).await?))
}

/// GET /api/attendance/mine
pub async fn handle_my_records(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<AttendanceQuery>,
) -> Result<Json<Vec<AttendanceRow>>, AppError> {
    user.require(&[Role::Employee])?;
    let month = parse_month(params.month.as_deref())?;
    Ok(Json(list_records(&state.db, Some(user.user_id), month).await?))
}

/// GET /api/attendance/summary
/// Staff may ask about anyone; employees only about themselves.
pub async fn handle_summary(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<AttendanceQuery>,
) -> Result<Json<AttendanceSummary>, AppError> {
    let target = match (user.role, params.user_id) {
        (Role::Employee, None) => user.user_id,
        (Role::Employee, Some(id)) if id == user.user_id => id,
        (Role::Hr | Role::Admin, Some(id)) => id,
        (Role::Hr | Role::Admin, None) => {
            return Err(AppError::Validation("user_id is required".to_string()))
        }
        _ => return Err(AppError::Forbidden),
    };
    let month = parse_month(params.month.as_deref())?
        .unwrap_or_else(|| Month::of(Utc::now().date_naive()));
    let records = list_records(&state.db, Some(target), Some(month)).await?;
    Ok(Json(summarize(month, &records)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row(check_in: Option<chrono::DateTime<Utc>>, status: AttendanceStatus) -> AttendanceRow {
        AttendanceRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            attendance_date: NaiveDate::from_ymd_opt(2026, 4, 6).unwrap(),
            check_in,
            check_out: None,
            status,
            created_at: Utc::now(),
        }
    }

    fn message(err: AppError) -> String {
        match err {
            AppError::Conflict(msg) => msg,
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_check_in_conflict_reports_existing_state() {
        let at = Utc.with_ymd_and_hms(2026, 4, 6, 9, 5, 0).unwrap();
        assert_eq!(
            message(check_in_conflict(&row(Some(at), AttendanceStatus::Present))),
            "Already checked in today at 09:05"
        );
        assert_eq!(
            message(check_in_conflict(&row(None, AttendanceStatus::Leave))),
            "Today is booked as leave"
        );
        assert_eq!(
            message(check_in_conflict(&row(None, AttendanceStatus::Absent))),
            "Today's attendance was already marked as Absent"
        );
    }
}
