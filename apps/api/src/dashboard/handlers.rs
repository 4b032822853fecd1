use std::collections::BTreeMap;

use axum::extract::State;
use chrono::Utc;
use serde::Serialize;
use tracing::debug;

use crate::attendance::handlers::list_records;
use crate::attendance::summary::{summarize, AttendanceSummary};
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::extract::Json;
use crate::interviews::handlers::INTERVIEW_DETAIL_SELECT;
use crate::models::interview::InterviewDetailRow;
use crate::models::payroll::PayrollRow;
use crate::models::recruitment::ApplicationStatus;
use crate::models::user::Role;
use crate::state::AppState;
use crate::validation::Month;

#[derive(Debug, Serialize)]
pub struct EmployeeDashboard {
    pub attendance: AttendanceSummary,
    pub pending_leaves: i64,
    pub latest_payslip: Option<PayrollRow>,
    pub unread_notifications: i64,
}

#[derive(Debug, Serialize)]
pub struct CandidateDashboard {
    pub total_applications: i64,
    pub applications_by_status: BTreeMap<String, i64>,
    pub upcoming_interviews: Vec<InterviewDetailRow>,
    pub unread_notifications: i64,
}

async fn unread_count(state: &AppState, user: &CurrentUser) -> Result<i64, AppError> {
    Ok(
        sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND NOT read")
            .bind(user.user_id)
            .fetch_one(&state.db)
            .await?,
    )
}

fn upcoming_interviews_sql() -> String {
    format!(
        "{INTERVIEW_DETAIL_SELECT} \
         WHERE a.candidate_id = $1 AND i.status = 'Scheduled' AND i.interview_date >= $2 \
         ORDER BY i.interview_date, i.interview_time"
    )
}

/// GET /api/dashboard/employee
pub async fn handle_employee_dashboard(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<EmployeeDashboard>, AppError> {
    user.require(&[Role::Employee])?;
    let month = Month::of(Utc::now().date_naive());
    let records = list_records(&state.db, Some(user.user_id), Some(month)).await?;

    let pending_leaves: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM leaves WHERE user_id = $1 AND status = 'Pending'",
    )
    .bind(user.user_id)
    .fetch_one(&state.db)
    .await?;

    let latest_payslip: Option<PayrollRow> = sqlx::query_as(
        r#"
        SELECT * FROM payroll
        WHERE user_id = $1 AND status IN ('Approved', 'Paid')
        ORDER BY month DESC
        LIMIT 1
        "#,
    )
    .bind(user.user_id)
    .fetch_optional(&state.db)
    .await?;

    debug!(user_id = %user.user_id, "Employee dashboard assembled");
    Ok(Json(EmployeeDashboard {
        attendance: summarize(month, &records),
        pending_leaves,
        latest_payslip,
        unread_notifications: unread_count(&state, &user).await?,
    }))
}

/// GET /api/dashboard/candidate
pub async fn handle_candidate_dashboard(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<CandidateDashboard>, AppError> {
    user.require(&[Role::Candidate])?;
    let counts: Vec<(ApplicationStatus, i64)> = sqlx::query_as(
        "SELECT status, COUNT(*) FROM applications WHERE candidate_id = $1 GROUP BY status",
    )
    .bind(user.user_id)
    .fetch_all(&state.db)
    .await?;

    let sql = upcoming_interviews_sql();
    let upcoming_interviews = sqlx::query_as::<_, InterviewDetailRow>(&sql)
        .bind(user.user_id)
        .bind(Utc::now().date_naive())
        .fetch_all(&state.db)
        .await?;

    Ok(Json(CandidateDashboard {
        total_applications: counts.iter().map(|(_, n)| n).sum(),
        applications_by_status: counts
            .into_iter()
            .map(|(status, n)| (status.as_str().to_string(), n))
            .collect(),
        upcoming_interviews,
        unread_notifications: unread_count(&state, &user).await?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upcoming_interviews_reuse_detail_select() {
        let sql = upcoming_interviews_sql();
        assert!(sql.starts_with(INTERVIEW_DETAIL_SELECT));
        assert!(sql.contains("a.candidate_id = $1"));
        assert!(sql.contains("i.status = 'Scheduled'"));
        assert!(sql.trim_end().ends_with("ORDER BY i.interview_date, i.interview_time"));
    }
}
