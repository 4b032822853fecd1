use axum::{extract::State, http::StatusCode};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use tracing::info;
use uuid::Uuid;

use crate::auth::accounts::{require_active_employee, require_employee};
use crate::auth::extractor::STAFF;
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::exit::clearance::{
    all_cleared, check_clearance_update, check_resignation_decision, outstanding,
};
use crate::extract::{Json, Path, Query};
use crate::models::exit::{
    ClearanceDepartment, ClearanceRow, ClearanceStatus, ExitProcessRow, ExitStatus,
    ResignationDetailRow, ResignationRow, ResignationStatus,
};
use crate::models::notification::NotificationKind;
use crate::models::user::{EmploymentStatus, Role};
use crate::notifications::notify;
use crate::state::AppState;
use crate::validation::{optional_text, require_text};

#[derive(Debug, Deserialize)]
pub struct ResignRequest {
    pub resignation_date: NaiveDate,
    pub reason: String,
    pub feedback: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery<S> {
    pub status: Option<S>,
}

#[derive(Debug, Deserialize)]
pub struct DecideResignationRequest {
    pub status: ResignationStatus,
}

#[derive(Debug, Deserialize)]
pub struct StartExitRequest {
    pub user_id: Uuid,
    pub reason: String,
    pub last_working_day: NaiveDate,
    pub handover_notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateClearanceRequest {
    pub status: ClearanceStatus,
    pub remarks: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ExitProcessDetail {
    #[serde(flatten)]
    pub process: ExitProcessRow,
    pub clearances: Vec<ClearanceRow>,
}

#[derive(Debug, Serialize)]
pub struct MyExitStatus {
    pub resignation: Option<ResignationRow>,
    pub process: Option<ExitProcessDetail>,
}

struct NewExit<'a> {
    user_id: Uuid,
    resignation_id: Option<Uuid>,
    reason: &'a str,
    last_working_day: NaiveDate,
    handover_notes: Option<String>,
    initiated_by: Uuid,
}

/// Opens an exit process with one pending clearance per department and
/// moves the employee into `Exit Process`.
async fn start_exit(conn: &mut PgConnection, new: NewExit<'_>) -> Result<ExitProcessRow, AppError> {
    let employee = require_employee(&mut *conn, new.user_id).await?;
    if employee.is_exited() {
        return Err(AppError::Validation(format!(
            "Employee {} has already exited",
            employee.id
        )));
    }

    let process: ExitProcessRow = sqlx::query_as(
        r#"
        INSERT INTO exit_processes
            (user_id, resignation_id, reason, last_working_day, handover_notes, initiated_by)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(employee.id)
    .bind(new.resignation_id)
    .bind(new.reason)
    .bind(new.last_working_day)
    .bind(new.handover_notes)
    .bind(new.initiated_by)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| {
        AppError::on_unique_violation(e, "An exit process is already open for this employee")
    })?;

    for department in ClearanceDepartment::ALL {
        sqlx::query(
            "INSERT INTO clearances (exit_process_id, user_id, department) VALUES ($1, $2, $3)",
        )
        .bind(process.id)
        .bind(employee.id)
        .bind(department)
        .execute(&mut *conn)
        .await?;
    }

    sqlx::query("UPDATE users SET employment_status = $1, updated_at = now() WHERE id = $2")
        .bind(EmploymentStatus::ExitProcess)
        .bind(employee.id)
        .execute(&mut *conn)
        .await?;

    notify(
        &mut *conn,
        employee.id,
        NotificationKind::Exit,
        "Exit process started",
        &format!(
            "Your exit process has started. Last working day: {}.",
            process.last_working_day
        ),
    )
    .await?;

    info!(
        "Exit process {} initiated for {} by {}",
        process.id, employee.id, new.initiated_by
    );
    Ok(process)
}

async fn load_clearances(
    conn: &mut PgConnection,
    process_id: Uuid,
) -> Result<Vec<ClearanceRow>, AppError> {
    let mut rows: Vec<ClearanceRow> =
        sqlx::query_as("SELECT * FROM clearances WHERE exit_process_id = $1")
            .bind(process_id)
            .fetch_all(conn)
            .await?;
    rows.sort_by_key(|c| {
        ClearanceDepartment::ALL
            .iter()
            .position(|d| *d == c.department)
    });
    Ok(rows)
}

// ────────────────────────────────────────────────────────────────────────────
// Resignations
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/exit/resign
pub async fn handle_resign(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<ResignRequest>,
) -> Result<(StatusCode, Json<ResignationRow>), AppError> {
    user.require(&[Role::Employee])?;
    let reason = require_text("Reason", &req.reason)?;
    if req.resignation_date < Utc::now().date_naive() {
        return Err(AppError::Validation(
            "Resignation date cannot be in the past".to_string(),
        ));
    }

    require_active_employee(&state.db, user.user_id).await?;
    let mut tx = state.db.begin().await?;
    let open: Option<(Uuid,)> = sqlx::query_as(
        "SELECT id FROM resignations WHERE user_id = $1 AND status IN ('Pending', 'Approved')",
    )
    .bind(user.user_id)
    .fetch_optional(&mut *tx)
    .await?;
    if open.is_some() {
        return Err(AppError::Conflict(
            "You already have an open resignation".to_string(),
        ));
    }

    let row: ResignationRow = sqlx::query_as(
        r#"
        INSERT INTO resignations (user_id, resignation_date, reason, feedback)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(user.user_id)
    .bind(req.resignation_date)
    .bind(&reason)
    .bind(optional_text(req.feedback))
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    info!(user_id = %user.user_id, "Resignation {} submitted", row.id);
    Ok((StatusCode::CREATED, Json(row)))
}

/// GET /api/exit/resignations
pub async fn handle_list_resignations(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<StatusQuery<ResignationStatus>>,
) -> Result<Json<Vec<ResignationDetailRow>>, AppError> {
    user.require(STAFF)?;
    let rows = sqlx::query_as::<_, ResignationDetailRow>(
        r#"
        SELECT r.*, u.name AS employee_name, u.email AS employee_email, u.department
        FROM resignations r
        JOIN users u ON u.id = r.user_id
        WHERE ($1::TEXT IS NULL OR r.status = $1)
        ORDER BY r.submitted_at DESC
        "#,
    )
    .bind(params.status)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(rows))
}

/// PUT /api/exit/resignations/:id
/// Approval opens the exit process with the resignation date as last working day.
pub async fn handle_decide_resignation(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<DecideResignationRequest>,
) -> Result<Json<ResignationRow>, AppError> {
    user.require(STAFF)?;
    let mut tx = state.db.begin().await?;

    let existing: ResignationRow =
        sqlx::query_as("SELECT * FROM resignations WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::not_found("Resignation"))?;
    check_resignation_decision(existing.status, req.status)?;

    let row: ResignationRow = sqlx::query_as(
        "UPDATE resignations SET status = $1, decided_by = $2 WHERE id = $3 RETURNING *",
    )
    .bind(req.status)
    .bind(user.user_id)
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    if row.status == ResignationStatus::Approved {
        start_exit(
            &mut *tx,
            NewExit {
                user_id: row.user_id,
                resignation_id: Some(row.id),
                reason: &row.reason,
                last_working_day: row.resignation_date,
                handover_notes: None,
                initiated_by: user.user_id,
            },
        )
        .await?;
    } else {
        notify(
            &mut *tx,
            row.user_id,
            NotificationKind::Exit,
            "Resignation update",
            "Your resignation request was rejected.",
        )
        .await?;
    }
    tx.commit().await?;

    info!("Resignation {id} {:?} by {}", row.status, user.user_id);
    Ok(Json(row))
}

// ────────────────────────────────────────────────────────────────────────────
// Exit processes and clearances
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/exit/processes
pub async fn handle_start_exit(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<StartExitRequest>,
) -> Result<(StatusCode, Json<ExitProcessDetail>), AppError> {
    user.require(STAFF)?;
    let reason = require_text("Reason", &req.reason)?;

    let mut tx = state.db.begin().await?;
    let process = start_exit(
        &mut *tx,
        NewExit {
            user_id: req.user_id,
            resignation_id: None,
            reason: &reason,
            last_working_day: req.last_working_day,
            handover_notes: optional_text(req.handover_notes),
            initiated_by: user.user_id,
        },
    )
    .await?;
    let clearances = load_clearances(&mut *tx, process.id).await?;
    tx.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(ExitProcessDetail {
            process,
            clearances,
        }),
    ))
}

/// GET /api/exit/processes
pub async fn handle_list_exits(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<StatusQuery<ExitStatus>>,
) -> Result<Json<Vec<ExitProcessRow>>, AppError> {
    user.require(STAFF)?;
    let rows = sqlx::query_as::<_, ExitProcessRow>(
        r#"
        SELECT * FROM exit_processes
        WHERE ($1::TEXT IS NULL OR status = $1)
        ORDER BY initiated_at DESC
        "#,
    )
    .bind(params.status)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(rows))
}

/// GET /api/exit/processes/:id
pub async fn handle_get_exit(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ExitProcessDetail>, AppError> {
    user.require(STAFF)?;
    let mut conn = state.db.acquire().await?;
    let process: ExitProcessRow = sqlx::query_as("SELECT * FROM exit_processes WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::not_found("Exit process"))?;
    let clearances = load_clearances(&mut *conn, id).await?;
    Ok(Json(ExitProcessDetail {
        process,
        clearances,
    }))
}

/// PUT /api/exit/clearances/:id
pub async fn handle_update_clearance(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateClearanceRequest>,
) -> Result<Json<ClearanceRow>, AppError> {
    user.require(STAFF)?;
    let mut tx = state.db.begin().await?;

    let existing: ClearanceRow = sqlx::query_as("SELECT * FROM clearances WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("Clearance"))?;
    let (process_status,): (ExitStatus,) =
        sqlx::query_as("SELECT status FROM exit_processes WHERE id = $1")
            .bind(existing.exit_process_id)
            .fetch_one(&mut *tx)
            .await?;
    if process_status != ExitStatus::Initiated {
        return Err(AppError::InvalidTransition(
            "exit process is already completed".to_string(),
        ));
    }
    check_clearance_update(existing.status, req.status)?;

    let reopened = req.status == ClearanceStatus::Pending;
    let row: ClearanceRow = sqlx::query_as(
        r#"
        UPDATE clearances SET
            status = $1,
            remarks = COALESCE($2, remarks),
            approved_by = CASE WHEN $3 THEN NULL ELSE $4 END,
            approved_at = CASE WHEN $3 THEN NULL ELSE now() END
        WHERE id = $5
        RETURNING *
        "#,
    )
    .bind(req.status)
    .bind(optional_text(req.remarks))
    .bind(reopened)
    .bind(user.user_id)
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    info!(
        "Clearance {:?} for exit {} set to {:?} by {}",
        row.department, row.exit_process_id, row.status, user.user_id
    );
    Ok(Json(row))
}

/// POST /api/exit/processes/:id/complete
pub async fn handle_complete_exit(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ExitProcessDetail>, AppError> {
    user.require(STAFF)?;
    let mut tx = state.db.begin().await?;

    let existing: ExitProcessRow =
        sqlx::query_as("SELECT * FROM exit_processes WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::not_found("Exit process"))?;
    if existing.status != ExitStatus::Initiated {
        return Err(AppError::InvalidTransition(
            "exit process is already completed".to_string(),
        ));
    }

    let clearances = load_clearances(&mut *tx, id).await?;
    if !all_cleared(&clearances) {
        let pending: Vec<String> = outstanding(&clearances)
            .iter()
            .map(|d| format!("{d:?}"))
            .collect();
        return Err(AppError::Validation(format!(
            "All clearances must be approved; outstanding: {}",
            pending.join(", ")
        )));
    }

    let process: ExitProcessRow = sqlx::query_as(
        "UPDATE exit_processes SET status = $1, completed_at = now() WHERE id = $2 RETURNING *",
    )
    .bind(ExitStatus::Completed)
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("UPDATE users SET employment_status = $1, updated_at = now() WHERE id = $2")
        .bind(EmploymentStatus::Exited)
        .bind(process.user_id)
        .execute(&mut *tx)
        .await?;

    if let Some(resignation_id) = process.resignation_id {
        sqlx::query("UPDATE resignations SET status = $1 WHERE id = $2")
            .bind(ResignationStatus::Completed)
            .bind(resignation_id)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    info!(
        "Exit process {id} completed for {} by {}",
        process.user_id, user.user_id
    );
    Ok(Json(ExitProcessDetail {
        process,
        clearances,
    }))
}

/// GET /api/exit/mine
pub async fn handle_my_exit(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<MyExitStatus>, AppError> {
    user.require(&[Role::Employee])?;
    let mut conn = state.db.acquire().await?;

    let resignation: Option<ResignationRow> = sqlx::query_as(
        "SELECT * FROM resignations WHERE user_id = $1 ORDER BY submitted_at DESC LIMIT 1",
    )
    .bind(user.user_id)
    .fetch_optional(&mut *conn)
    .await?;

    let process: Option<ExitProcessRow> = sqlx::query_as(
        "SELECT * FROM exit_processes WHERE user_id = $1 ORDER BY initiated_at DESC LIMIT 1",
    )
    .bind(user.user_id)
    .fetch_optional(&mut *conn)
    .await?;

    let process = match process {
        Some(process) => {
            let clearances = load_clearances(&mut *conn, process.id).await?;
            Some(ExitProcessDetail {
                process,
                clearances,
            })
        }
        None => None,
    };

    Ok(Json(MyExitStatus {
        resignation,
        process,
    }))
}
