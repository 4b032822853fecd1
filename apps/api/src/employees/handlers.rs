use axum::{extract::State, http::StatusCode};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::accounts::{create_user, require_employee, validate_salary, NewUser};
use crate::auth::extractor::STAFF;
use crate::auth::password::generate_temporary_password;
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::extract::{Json, Path, Query};
use crate::models::user::{EmploymentStatus, Role, UserRow};
use crate::state::AppState;
use crate::validation::{optional_text, require_text};

#[derive(Debug, Deserialize)]
pub struct EmployeeQuery {
    pub department: Option<String>,
    pub status: Option<EmploymentStatus>,
}

#[derive(Debug, Deserialize)]
pub struct OnboardRequest {
    pub name: String,
    pub email: String,
    pub department: String,
    pub designation: String,
    pub salary: f64,
    pub joining_date: Option<NaiveDate>,
    pub manager_id: Option<Uuid>,
}

/// The temporary password is only ever returned here.
#[derive(Debug, Serialize)]
pub struct OnboardResponse {
    pub employee: UserRow,
    pub temporary_password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateEmployeeRequest {
    pub department: Option<String>,
    pub designation: Option<String>,
    pub salary: Option<f64>,
    pub manager_id: Option<Uuid>,
    pub employment_status: Option<EmploymentStatus>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSelfRequest {
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Exit statuses belong to the exit workflow.
fn check_manual_status(status: Option<EmploymentStatus>) -> Result<(), AppError> {
    match status {
        Some(EmploymentStatus::ExitProcess | EmploymentStatus::Exited) => {
            Err(AppError::Validation(
                "Exit statuses are managed through the exit process".to_string(),
            ))
        }
        _ => Ok(()),
    }
}

fn check_manager(employee_id: Uuid, manager_id: Option<Uuid>) -> Result<(), AppError> {
    if manager_id == Some(employee_id) {
        return Err(AppError::Validation(
            "An employee cannot manage themselves".to_string(),
        ));
    }
    Ok(())
}

/// GET /api/employees
pub async fn handle_list_employees(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<EmployeeQuery>,
) -> Result<Json<Vec<UserRow>>, AppError> {
    user.require(STAFF)?;
    let rows = sqlx::query_as::<_, UserRow>(
        r#"
        SELECT * FROM users
        WHERE role = 'Employee'
          AND ($1::TEXT IS NULL OR department = $1)
          AND ($2::TEXT IS NULL OR employment_status = $2)
        ORDER BY name
        "#,
    )
    .bind(optional_text(params.department))
    .bind(params.status)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(rows))
}

/// GET /api/employees/:id
pub async fn handle_get_employee(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<UserRow>, AppError> {
    user.require(STAFF)?;
    let employee = require_employee(&state.db, id)
        .await
        .map_err(|e| match e {
            AppError::Validation(_) => AppError::not_found("Employee"),
            other => other,
        })?;
    Ok(Json(employee))
}

/// POST /api/employees
pub async fn handle_onboard_employee(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<OnboardRequest>,
) -> Result<(StatusCode, Json<OnboardResponse>), AppError> {
    user.require(STAFF)?;
    let department = require_text("Department", &req.department)?;
    let designation = require_text("Designation", &req.designation)?;
    validate_salary(Some(req.salary))?;

    let mut tx = state.db.begin().await?;
    if let Some(manager_id) = req.manager_id {
        require_employee(&mut *tx, manager_id).await?;
    }

    let temporary_password = generate_temporary_password();
    let employee = create_user(
        &mut *tx,
        NewUser {
            department: Some(&department),
            designation: Some(&designation),
            salary: Some(req.salary),
            joining_date: Some(req.joining_date.unwrap_or_else(|| Utc::now().date_naive())),
            manager_id: req.manager_id,
            ..NewUser::basic(&req.name, &req.email, &temporary_password, Role::Employee)
        },
    )
    .await?;
    tx.commit().await?;

    info!("Employee {} onboarded by {}", employee.id, user.user_id);
    Ok((
        StatusCode::CREATED,
        Json(OnboardResponse {
            employee,
            temporary_password,
        }),
    ))
}

/// PUT /api/employees/:id
pub async fn handle_update_employee(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateEmployeeRequest>,
) -> Result<Json<UserRow>, AppError> {
    user.require(STAFF)?;
    check_manual_status(req.employment_status)?;
    check_manager(id, req.manager_id)?;
    validate_salary(req.salary)?;

    let mut tx = state.db.begin().await?;
    let existing = require_employee(&mut *tx, id).await?;
    if matches!(
        existing.employment_status,
        Some(EmploymentStatus::ExitProcess | EmploymentStatus::Exited)
    ) && req.employment_status.is_some()
    {
        return Err(AppError::InvalidTransition(
            "employee is in the exit workflow".to_string(),
        ));
    }
    if let Some(manager_id) = req.manager_id {
        require_employee(&mut *tx, manager_id).await?;
    }

    let row: UserRow = sqlx::query_as(
        r#"
        UPDATE users SET
            department = COALESCE($1, department),
            designation = COALESCE($2, designation),
            salary = COALESCE($3, salary),
            manager_id = COALESCE($4, manager_id),
            employment_status = COALESCE($5, employment_status),
            updated_at = now()
        WHERE id = $6
        RETURNING *
        "#,
    )
    .bind(optional_text(req.department))
    .bind(optional_text(req.designation))
    .bind(req.salary)
    .bind(req.manager_id)
    .bind(req.employment_status)
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    info!("Employee {id} updated by {}", user.user_id);
    Ok(Json(row))
}

/// GET /api/employees/me
pub async fn handle_get_self(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<UserRow>, AppError> {
    user.require(&[Role::Employee])?;
    Ok(Json(require_employee(&state.db, user.user_id).await?))
}

/// PUT /api/employees/me
pub async fn handle_update_self(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<UpdateSelfRequest>,
) -> Result<Json<UserRow>, AppError> {
    user.require(&[Role::Employee])?;
    let row: UserRow = sqlx::query_as(
        r#"
        UPDATE users SET
            phone = COALESCE($1, phone),
            address = COALESCE($2, address),
            updated_at = now()
        WHERE id = $3
        RETURNING *
        "#,
    )
    .bind(optional_text(req.phone))
    .bind(optional_text(req.address))
    .bind(user.user_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::not_found("Employee"))?;

    info!(user_id = %user.user_id, "Contact details updated");
    Ok(Json(row))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_statuses_cannot_be_set_by_hand() {
        assert!(check_manual_status(None).is_ok());
        assert!(check_manual_status(Some(EmploymentStatus::Active)).is_ok());
        assert!(check_manual_status(Some(EmploymentStatus::Inactive)).is_ok());
        assert!(check_manual_status(Some(EmploymentStatus::ExitProcess)).is_err());
        assert!(check_manual_status(Some(EmploymentStatus::Exited)).is_err());
    }

    #[test]
    fn test_self_management_is_rejected() {
        let id = Uuid::new_v4();
        assert!(check_manager(id, Some(id)).is_err());
        assert!(check_manager(id, Some(Uuid::new_v4())).is_ok());
        assert!(check_manager(id, None).is_ok());
    }
}
