use axum::{
    extract::{multipart::Field, Multipart, State},
    http::StatusCode,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::accounts::validate_salary;
use crate::auth::extractor::STAFF;
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::extract::{Json, Path};
use crate::models::notification::NotificationKind;
use crate::models::recruitment::{
    ApplicationDetailRow, ApplicationRow, ApplicationStatus, JobPostRow, JobStatus,
};
use crate::models::user::{EmploymentStatus, Role, UserRow};
use crate::notifications::notify;
use crate::recruitment::pipeline::check_transition;
use crate::recruitment::resume::{ParsedResume, ResumeFile};
use crate::recruitment::storage::{check_size, discard_resume, resume_key, store_resume};
use crate::state::AppState;
use crate::validation::{optional_text, require_text};

const APPLICATION_DETAIL_SELECT: &str = r#"
    SELECT a.id, a.job_id, j.title AS job_title, a.candidate_id,
           u.name AS candidate_name, u.email AS candidate_email,
           a.resume_key, a.cover_letter, a.parsed_skills, a.experience_years,
           a.status, a.applied_at
    FROM applications a
    JOIN job_posts j ON j.id = a.job_id
    JOIN users u ON u.id = a.candidate_id
"#;

#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    pub title: String,
    pub department: String,
    pub description: String,
    pub skills: Vec<String>,
    pub deadline: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct UpdateJobRequest {
    pub title: Option<String>,
    pub department: Option<String>,
    pub description: Option<String>,
    pub skills: Option<Vec<String>>,
    pub deadline: Option<NaiveDate>,
    pub status: Option<JobStatus>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateApplicationRequest {
    pub status: ApplicationStatus,
}

#[derive(Debug, Deserialize)]
pub struct ShortlistRequest {
    pub application_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct ShortlistResponse {
    pub updated: usize,
}

#[derive(Debug, Deserialize)]
pub struct HireRequest {
    pub department: Option<String>,
    pub designation: Option<String>,
    pub salary: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct HireResponse {
    pub application: ApplicationRow,
    pub employee: UserRow,
}

fn clean_skills(skills: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(skills.len());
    for skill in skills {
        let skill = skill.trim();
        if !skill.is_empty() && !out.iter().any(|s| s.eq_ignore_ascii_case(skill)) {
            out.push(skill.to_string());
        }
    }
    out
}

fn check_deadline(deadline: NaiveDate, today: NaiveDate) -> Result<(), AppError> {
    if deadline < today {
        return Err(AppError::Validation(
            "Deadline cannot be in the past".to_string(),
        ));
    }
    Ok(())
}

/// A job accepts applications while open and until the end of its deadline day.
fn check_accepting(job: &JobPostRow, today: NaiveDate) -> Result<(), AppError> {
    if job.status != JobStatus::Open {
        return Err(AppError::Validation(
            "This job is no longer accepting applications".to_string(),
        ));
    }
    if job.deadline < today {
        return Err(AppError::Validation(
            "The application deadline has passed".to_string(),
        ));
    }
    Ok(())
}

async fn require_job(conn: &mut PgConnection, id: Uuid) -> Result<JobPostRow, AppError> {
    sqlx::query_as("SELECT * FROM job_posts WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::not_found("Job"))
}

// ────────────────────────────────────────────────────────────────────────────
// Job postings
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/recruitment/jobs
pub async fn handle_list_jobs(
    State(state): State<AppState>,
) -> Result<Json<Vec<JobPostRow>>, AppError> {
    let jobs = sqlx::query_as::<_, JobPostRow>(
        "SELECT * FROM job_posts WHERE status = 'Open' ORDER BY created_at DESC",
    )
    .fetch_all(&state.db)
    .await?;
    Ok(Json(jobs))
}

/// GET /api/recruitment/jobs/:id
pub async fn handle_get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobPostRow>, AppError> {
    let mut conn = state.db.acquire().await?;
    Ok(Json(require_job(&mut *conn, id).await?))
}

/// POST /api/recruitment/jobs
pub async fn handle_create_job(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreateJobRequest>,
) -> Result<(StatusCode, Json<JobPostRow>), AppError> {
    user.require(STAFF)?;
    let title = require_text("Title", &req.title)?;
    let department = require_text("Department", &req.department)?;
    let description = require_text("Description", &req.description)?;
    let skills = clean_skills(req.skills);
    if skills.is_empty() {
        return Err(AppError::Validation("Skills are required".to_string()));
    }
    check_deadline(req.deadline, Utc::now().date_naive())?;

    let job: JobPostRow = sqlx::query_as(
        r#"
        INSERT INTO job_posts (title, department, description, skills, deadline, created_by)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(&title)
    .bind(&department)
    .bind(&description)
    .bind(&skills)
    .bind(req.deadline)
    .bind(user.user_id)
    .fetch_one(&state.db)
    .await?;

    info!("Job {} '{}' posted by {}", job.id, job.title, user.user_id);
    Ok((StatusCode::CREATED, Json(job)))
}

/// PUT /api/recruitment/jobs/:id
pub async fn handle_update_job(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateJobRequest>,
) -> Result<Json<JobPostRow>, AppError> {
    user.require(STAFF)?;
    let title = req.title.as_deref().map(|t| require_text("Title", t)).transpose()?;
    let department = req
        .department
        .as_deref()
        .map(|d| require_text("Department", d))
        .transpose()?;
    let description = req
        .description
        .as_deref()
        .map(|d| require_text("Description", d))
        .transpose()?;
    let skills = req.skills.map(clean_skills);
    if let Some(deadline) = req.deadline {
        check_deadline(deadline, Utc::now().date_naive())?;
    }

    let job: JobPostRow = sqlx::query_as(
        r#"
        UPDATE job_posts SET
            title = COALESCE($1, title),
            department = COALESCE($2, department),
            description = COALESCE($3, description),
            skills = COALESCE($4, skills),
            deadline = COALESCE($5, deadline),
            status = COALESCE($6, status),
            updated_at = now()
        WHERE id = $7
        RETURNING *
        "#,
    )
    .bind(title)
    .bind(department)
    .bind(description)
    .bind(skills)
    .bind(req.deadline)
    .bind(req.status)
    .bind(id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::not_found("Job"))?;

    info!("Job {} updated by {}", job.id, user.user_id);
    Ok(Json(job))
}

// ────────────────────────────────────────────────────────────────────────────
// Applying
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct ApplicationForm {
    job_id: Option<Uuid>,
    cover_letter: Option<String>,
    resume: Option<ResumeFile>,
}

async fn read_file(field: Field<'_>) -> Result<ResumeFile, AppError> {
    let file_name = field.file_name().unwrap_or("resume").to_string();
    let content_type = field.content_type().map(str::to_string);
    let data = field
        .bytes()
        .await
        .map_err(|e| AppError::Validation(format!("Could not read upload: {e}")))?;
    let file = ResumeFile {
        file_name,
        content_type,
        data,
    };
    check_size(&file)?;
    Ok(file)
}

async fn read_application_form(mut multipart: Multipart) -> Result<ApplicationForm, AppError> {
    let mut form = ApplicationForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("job_id") => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Invalid job_id: {e}")))?;
                form.job_id = Some(
                    Uuid::parse_str(raw.trim())
                        .map_err(|_| AppError::Validation("Invalid job_id".to_string()))?,
                );
            }
            Some("cover_letter") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Invalid cover letter: {e}")))?;
                form.cover_letter = optional_text(Some(text));
            }
            Some("resume") => form.resume = Some(read_file(field).await?),
            _ => {}
        }
    }
    Ok(form)
}

/// POST /api/recruitment/apply
/// A resume that cannot be parsed is still stored; the application just carries no parsed skills.
pub async fn handle_apply(
    State(state): State<AppState>,
    user: CurrentUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApplicationRow>), AppError> {
    user.require(&[Role::Candidate])?;
    let form = read_application_form(multipart).await?;
    let job_id = form
        .job_id
        .ok_or_else(|| AppError::Validation("job_id is required".to_string()))?;

    let mut conn = state.db.acquire().await?;
    let job = require_job(&mut *conn, job_id).await?;
    check_accepting(&job, Utc::now().date_naive())?;

    let already: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM applications WHERE job_id = $1 AND candidate_id = $2")
            .bind(job_id)
            .bind(user.user_id)
            .fetch_optional(&mut *conn)
            .await?;
    if already.is_some() {
        return Err(AppError::Conflict(
            "You have already applied for this job".to_string(),
        ));
    }

    let mut parsed = ParsedResume::default();
    if let Some(file) = &form.resume {
        match state.resume_parser.parse(file).await {
            Ok(result) => parsed = result,
            Err(e) => warn!(
                "Resume parse failed ({} backend) for candidate {}: {e}",
                state.resume_parser.backend(),
                user.user_id
            ),
        }
    }
    let key = form
        .resume
        .as_ref()
        .map(|file| resume_key(user.user_id, &file.file_name));

    drop(conn);

    // Upload only once the rows are written; a failed commit removes the object.
    let mut tx = state.db.begin().await?;
    let application: ApplicationRow = sqlx::query_as(
        r#"
        INSERT INTO applications
            (job_id, candidate_id, resume_key, cover_letter, parsed_skills, experience_years)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(job_id)
    .bind(user.user_id)
    .bind(&key)
    .bind(&form.cover_letter)
    .bind(&parsed.skills)
    .bind(parsed.experience_years)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| AppError::on_unique_violation(e, "You have already applied for this job"))?;

    if let (Some(key), Some(file)) = (&key, &form.resume) {
        sqlx::query(
            r#"
            INSERT INTO candidate_profiles (user_id, resume_key) VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET resume_key = EXCLUDED.resume_key, updated_at = now()
            "#,
        )
        .bind(user.user_id)
        .bind(key)
        .execute(&mut *tx)
        .await?;
        store_resume(&state.s3, &state.config.s3_bucket, key, file).await?;
    }

    if let Err(e) = tx.commit().await {
        if let Some(key) = &key {
            discard_resume(&state.s3, &state.config.s3_bucket, key).await;
        }
        return Err(e.into());
    }

    info!(
        "Candidate {} applied to job {} ({} parsed skills)",
        user.user_id,
        job_id,
        application.parsed_skills.len()
    );
    Ok((StatusCode::CREATED, Json(application)))
}

/// POST /api/recruitment/parse-resume
pub async fn handle_parse_resume(
    State(state): State<AppState>,
    _user: CurrentUser,
    mut multipart: Multipart,
) -> Result<Json<ParsedResume>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() == Some("resume") {
            let file = read_file(field).await?;
            return Ok(Json(state.resume_parser.parse(&file).await?));
        }
    }
    Err(AppError::Validation("resume file is required".to_string()))
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/recruitment/jobs/:id/applications
pub async fn handle_job_applications(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(job_id): Path<Uuid>,
) -> Result<Json<Vec<ApplicationDetailRow>>, AppError> {
    user.require(STAFF)?;
    let mut conn = state.db.acquire().await?;
    require_job(&mut *conn, job_id).await?;

    let sql = format!("{APPLICATION_DETAIL_SELECT} WHERE a.job_id = $1 ORDER BY a.applied_at DESC");
    let rows = sqlx::query_as::<_, ApplicationDetailRow>(&sql)
        .bind(job_id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(Json(rows))
}

/// GET /api/recruitment/applications/mine
pub async fn handle_my_applications(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<ApplicationDetailRow>>, AppError> {
    user.require(&[Role::Candidate])?;
    let sql = format!(
        "{APPLICATION_DETAIL_SELECT} WHERE a.candidate_id = $1 ORDER BY a.applied_at DESC"
    );
    let rows = sqlx::query_as::<_, ApplicationDetailRow>(&sql)
        .bind(user.user_id)
        .fetch_all(&state.db)
        .await?;
    Ok(Json(rows))
}

async fn lock_application(
    conn: &mut PgConnection,
    id: Uuid,
) -> Result<ApplicationRow, AppError> {
    sqlx::query_as("SELECT * FROM applications WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::not_found("Application"))
}

/// Notification sent to the candidate when their application changes status, if any.
fn status_notice(status: ApplicationStatus, job_title: &str) -> Option<(NotificationKind, String)> {
    match status {
        ApplicationStatus::Shortlisted => Some((
            NotificationKind::Shortlist,
            format!("You have been shortlisted for {job_title}."),
        )),
        ApplicationStatus::Rejected => Some((
            NotificationKind::Rejection,
            format!("Your application for {job_title} was not selected."),
        )),
        _ => None,
    }
}

async fn job_title(conn: &mut PgConnection, job_id: Uuid) -> Result<String, AppError> {
    let (title,): (String,) = sqlx::query_as("SELECT title FROM job_posts WHERE id = $1")
        .bind(job_id)
        .fetch_one(conn)
        .await?;
    Ok(title)
}

/// PUT /api/recruitment/applications/:id
pub async fn handle_update_application(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateApplicationRequest>,
) -> Result<Json<ApplicationRow>, AppError> {
    user.require(STAFF)?;
    if req.status == ApplicationStatus::Hired {
        return Err(AppError::Validation(
            "Use the hire endpoint to hire a candidate".to_string(),
        ));
    }

    let mut tx = state.db.begin().await?;
    let existing = lock_application(&mut *tx, id).await?;
    check_transition(existing.status, req.status)?;

    let row: ApplicationRow = sqlx::query_as(
        "UPDATE applications SET status = $1, updated_at = now() WHERE id = $2 RETURNING *",
    )
    .bind(req.status)
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    let title = job_title(&mut *tx, row.job_id).await?;
    if let Some((kind, message)) = status_notice(row.status, &title) {
        notify(&mut *tx, row.candidate_id, kind, "Application update", &message).await?;
    }
    tx.commit().await?;

    info!(
        "Application {id} moved {} -> {} by {}",
        existing.status.as_str(),
        row.status.as_str(),
        user.user_id
    );
    Ok(Json(row))
}

/// POST /api/recruitment/applications/shortlist
/// Only pending applications are moved; the rest are left untouched.
pub async fn handle_bulk_shortlist(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<ShortlistRequest>,
) -> Result<Json<ShortlistResponse>, AppError> {
    user.require(STAFF)?;
    if req.application_ids.is_empty() {
        return Err(AppError::Validation(
            "application_ids must not be empty".to_string(),
        ));
    }

    let mut tx = state.db.begin().await?;
    let moved: Vec<(Uuid, String)> = sqlx::query_as(
        r#"
        UPDATE applications a SET status = 'Shortlisted', updated_at = now()
        FROM job_posts j
        WHERE a.job_id = j.id AND a.id = ANY($1) AND a.status = 'Pending'
        RETURNING a.candidate_id, j.title
        "#,
    )
    .bind(&req.application_ids)
    .fetch_all(&mut *tx)
    .await?;

    for (candidate_id, title) in &moved {
        if let Some((kind, message)) = status_notice(ApplicationStatus::Shortlisted, title) {
            notify(&mut *tx, *candidate_id, kind, "Application update", &message).await?;
        }
    }
    tx.commit().await?;

    info!(
        "Bulk shortlisted {}/{} applications by {}",
        moved.len(),
        req.application_ids.len(),
        user.user_id
    );
    Ok(Json(ShortlistResponse {
        updated: moved.len(),
    }))
}

/// POST /api/recruitment/applications/:id/hire
/// Converts the candidate's account into an active employee.
pub async fn handle_hire(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<HireRequest>,
) -> Result<Json<HireResponse>, AppError> {
    user.require(STAFF)?;
    validate_salary(req.salary)?;

    let mut tx = state.db.begin().await?;
    let existing = lock_application(&mut *tx, id).await?;
    check_transition(existing.status, ApplicationStatus::Hired)?;
    let title = job_title(&mut *tx, existing.job_id).await?;

    let application: ApplicationRow = sqlx::query_as(
        "UPDATE applications SET status = $1, updated_at = now() WHERE id = $2 RETURNING *",
    )
    .bind(ApplicationStatus::Hired)
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    let employee: UserRow = sqlx::query_as(
        r#"
        UPDATE users SET
            role = $1,
            employment_status = $2,
            joining_date = $3,
            department = COALESCE($4, department),
            designation = COALESCE($5, designation, $6),
            salary = COALESCE($7, salary),
            updated_at = now()
        WHERE id = $8
        RETURNING *
        "#,
    )
    .bind(Role::Employee)
    .bind(EmploymentStatus::Active)
    .bind(Utc::now().date_naive())
    .bind(optional_text(req.department))
    .bind(optional_text(req.designation))
    .bind(&title)
    .bind(req.salary)
    .bind(existing.candidate_id)
    .fetch_one(&mut *tx)
    .await?;

    notify(
        &mut *tx,
        employee.id,
        NotificationKind::Hire,
        "Congratulations!",
        &format!("You have been hired as {title}. Welcome aboard!"),
    )
    .await?;
    tx.commit().await?;

    info!(
        "Candidate {} hired via application {} by {}",
        employee.id, id, user.user_id
    );
    Ok(Json(HireResponse {
        application,
        employee,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn job(status: JobStatus, deadline: NaiveDate) -> JobPostRow {
        JobPostRow {
            id: Uuid::new_v4(),
            title: "Backend Engineer".into(),
            department: "Engineering".into(),
            description: "Build APIs".into(),
            skills: vec!["Rust".into()],
            deadline,
            status,
            created_by: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_clean_skills_trims_and_dedups() {
        let skills = vec![
            " Rust ".to_string(),
            "".to_string(),
            "rust".to_string(),
            "SQL".to_string(),
        ];
        assert_eq!(clean_skills(skills), vec!["Rust", "SQL"]);
    }

    #[test]
    fn test_deadline_today_is_allowed() {
        let today = Utc::now().date_naive();
        assert!(check_deadline(today, today).is_ok());
        assert!(check_deadline(today - Duration::days(1), today).is_err());
    }

    #[test]
    fn test_closed_or_expired_jobs_refuse_applications() {
        let today = Utc::now().date_naive();
        assert!(check_accepting(&job(JobStatus::Open, today), today).is_ok());
        assert!(check_accepting(&job(JobStatus::Closed, today), today).is_err());
        assert!(
            check_accepting(&job(JobStatus::Open, today - Duration::days(1)), today).is_err()
        );
    }

    #[test]
    fn test_only_shortlist_and_rejection_notify() {
        assert!(matches!(
            status_notice(ApplicationStatus::Shortlisted, "QA"),
            Some((NotificationKind::Shortlist, _))
        ));
        assert!(matches!(
            status_notice(ApplicationStatus::Rejected, "QA"),
            Some((NotificationKind::Rejection, _))
        ));
        assert!(status_notice(ApplicationStatus::Pending, "QA").is_none());
    }
}
