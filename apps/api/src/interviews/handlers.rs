use axum::{extract::State, http::StatusCode};
use chrono::{NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tracing::info;
use uuid::Uuid;

use crate::auth::extractor::STAFF;
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::extract::{Json, Path, Query};
use crate::interviews::{check_update, validate_rating};
use crate::models::interview::{InterviewDetailRow, InterviewMode, InterviewRow, InterviewStatus};
use crate::models::notification::NotificationKind;
use crate::models::recruitment::{ApplicationRow, ApplicationStatus};
use crate::models::user::Role;
use crate::notifications::notify;
use crate::recruitment::pipeline::check_schedulable;
use crate::state::AppState;
use crate::validation::optional_text;

pub(crate) const INTERVIEW_DETAIL_SELECT: &str = r#"
    SELECT i.id, i.application_id, a.candidate_id,
           u.name AS candidate_name, u.email AS candidate_email,
           j.title AS job_title, i.mode, i.interview_date, i.interview_time,
           i.interviewer, i.status, i.feedback, i.rating
    FROM interviews i
    JOIN applications a ON a.id = i.application_id
    JOIN users u ON u.id = a.candidate_id
    JOIN job_posts j ON j.id = a.job_id
"#;

#[derive(Debug, Deserialize)]
pub struct ScheduleInterviewRequest {
    pub application_id: Uuid,
    pub mode: InterviewMode,
    pub interview_date: NaiveDate,
    pub interview_time: NaiveTime,
    pub interviewer: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateInterviewRequest {
    pub status: InterviewStatus,
    pub feedback: Option<String>,
    pub rating: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct InterviewQuery {
    pub status: Option<InterviewStatus>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct RecruitmentStats {
    pub total_applications: i64,
    pub pending_applications: i64,
    pub shortlisted_applications: i64,
    pub scheduled_interviews: i64,
    pub total_employees: i64,
}

/// POST /api/interviews
/// Scheduling moves the application into the `Interview` stage; further rounds keep it there.
pub async fn handle_schedule_interview(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<ScheduleInterviewRequest>,
) -> Result<(StatusCode, Json<InterviewRow>), AppError> {
    user.require(STAFF)?;
    if req.interview_date < Utc::now().date_naive() {
        return Err(AppError::Validation(
            "Interview date cannot be in the past".to_string(),
        ));
    }

    let mut tx = state.db.begin().await?;
    let application: ApplicationRow =
        sqlx::query_as("SELECT * FROM applications WHERE id = $1 FOR UPDATE")
            .bind(req.application_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::not_found("Application"))?;
    check_schedulable(application.status)?;
    if application.status != ApplicationStatus::Interview {
        sqlx::query("UPDATE applications SET status = $1, updated_at = now() WHERE id = $2")
            .bind(ApplicationStatus::Interview)
            .bind(application.id)
            .execute(&mut *tx)
            .await?;
    }

    let interview: InterviewRow = sqlx::query_as(
        r#"
        INSERT INTO interviews
            (application_id, mode, interview_date, interview_time, interviewer, created_by)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(application.id)
    .bind(req.mode)
    .bind(req.interview_date)
    .bind(req.interview_time)
    .bind(optional_text(req.interviewer))
    .bind(user.user_id)
    .fetch_one(&mut *tx)
    .await?;

    notify(
        &mut *tx,
        application.candidate_id,
        NotificationKind::Interview,
        "Interview scheduled",
        &format!(
            "Your {:?} interview is scheduled for {} at {}.",
            interview.mode,
            interview.interview_date,
            interview.interview_time.format("%H:%M")
        ),
    )
    .await?;
    tx.commit().await?;

    info!(
        "Interview {} scheduled for application {} by {}",
        interview.id, application.id, user.user_id
    );
    Ok((StatusCode::CREATED, Json(interview)))
}

/// GET /api/interviews
pub async fn handle_list_interviews(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<InterviewQuery>,
) -> Result<Json<Vec<InterviewDetailRow>>, AppError> {
    user.require(STAFF)?;
    let sql = format!(
        "{INTERVIEW_DETAIL_SELECT}
         WHERE ($1::TEXT IS NULL OR i.status = $1)
         ORDER BY i.interview_date DESC, i.interview_time DESC"
    );
    let rows = sqlx::query_as::<_, InterviewDetailRow>(&sql)
        .bind(params.status)
        .fetch_all(&state.db)
        .await?;
    Ok(Json(rows))
}

/// GET /api/interviews/mine
pub async fn handle_my_interviews(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<InterviewDetailRow>>, AppError> {
    user.require(&[Role::Candidate])?;
    let sql = format!(
        "{INTERVIEW_DETAIL_SELECT}
         WHERE a.candidate_id = $1
         ORDER BY i.interview_date DESC, i.interview_time DESC"
    );
    let rows = sqlx::query_as::<_, InterviewDetailRow>(&sql)
        .bind(user.user_id)
        .fetch_all(&state.db)
        .await?;
    Ok(Json(rows))
}

/// PUT /api/interviews/:id
pub async fn handle_update_interview(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateInterviewRequest>,
) -> Result<Json<InterviewRow>, AppError> {
    user.require(STAFF)?;
    validate_rating(req.rating)?;

    let mut tx = state.db.begin().await?;
    let existing: InterviewRow =
        sqlx::query_as("SELECT * FROM interviews WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::not_found("Interview"))?;
    check_update(existing.status, req.status)?;

    let row: InterviewRow = sqlx::query_as(
        r#"
        UPDATE interviews SET
            status = $1,
            feedback = COALESCE($2, feedback),
            rating = COALESCE($3, rating)
        WHERE id = $4
        RETURNING *
        "#,
    )
    .bind(req.status)
    .bind(optional_text(req.feedback))
    .bind(req.rating)
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    info!("Interview {id} marked {:?} by {}", row.status, user.user_id);
    Ok(Json(row))
}

/// GET /api/interviews/dashboard/stats
pub async fn handle_recruitment_stats(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<RecruitmentStats>, AppError> {
    user.require(STAFF)?;
    let stats: RecruitmentStats = sqlx::query_as(
        r#"
        SELECT
            (SELECT COUNT(*) FROM applications) AS total_applications,
            (SELECT COUNT(*) FROM applications WHERE status = 'Pending') AS pending_applications,
            (SELECT COUNT(*) FROM applications WHERE status = 'Shortlisted') AS shortlisted_applications,
            (SELECT COUNT(*) FROM interviews WHERE status = 'Scheduled') AS scheduled_interviews,
            (SELECT COUNT(*) FROM users WHERE role = 'Employee') AS total_employees
        "#,
    )
    .fetch_one(&state.db)
    .await?;
    Ok(Json(stats))
}
