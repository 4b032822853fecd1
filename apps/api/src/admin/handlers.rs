use axum::{extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tracing::info;
use uuid::Uuid;

use crate::auth::accounts::{create_user, NewUser};
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::extract::{Json, Path, Query};
use crate::models::user::{Role, UserRow};
use crate::state::AppState;
use crate::validation::{optional_text, require_text};

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub department: Option<String>,
    pub designation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub department: Option<String>,
    pub designation: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct AdminStats {
    pub total_users: i64,
    pub employees: i64,
    pub candidates: i64,
    pub jobs: i64,
    pub applications: i64,
    pub total_payroll: f64,
}

/// GET /api/admin/users
pub async fn handle_list_users(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<UserQuery>,
) -> Result<Json<Vec<UserRow>>, AppError> {
    user.require(&[Role::Admin])?;
    let rows = sqlx::query_as::<_, UserRow>(
        r#"
        SELECT * FROM users
        WHERE ($1::TEXT IS NULL OR role = $1)
        ORDER BY created_at DESC
        "#,
    )
    .bind(params.role)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(rows))
}

/// POST /api/admin/users
pub async fn handle_create_user(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserRow>), AppError> {
    user.require(&[Role::Admin])?;
    let department = optional_text(req.department);
    let designation = optional_text(req.designation);

    let mut conn = state.db.acquire().await?;
    let created = create_user(
        &mut *conn,
        NewUser {
            department: department.as_deref(),
            designation: designation.as_deref(),
            ..NewUser::basic(&req.name, &req.email, &req.password, req.role)
        },
    )
    .await?;

    info!(
        "Admin {} created {} account {}",
        user.user_id,
        created.role.as_str(),
        created.id
    );
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /api/admin/users/:id
pub async fn handle_update_user(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<UserRow>, AppError> {
    user.require(&[Role::Admin])?;
    let name = req.name.as_deref().map(|n| require_text("Name", n)).transpose()?;

    let row: UserRow = sqlx::query_as(
        r#"
        UPDATE users SET
            name = COALESCE($1, name),
            department = COALESCE($2, department),
            designation = COALESCE($3, designation),
            phone = COALESCE($4, phone),
            updated_at = now()
        WHERE id = $5
        RETURNING *
        "#,
    )
    .bind(name)
    .bind(optional_text(req.department))
    .bind(optional_text(req.designation))
    .bind(optional_text(req.phone))
    .bind(id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::not_found("User"))?;

    info!("Admin {} updated user {}", user.user_id, id);
    Ok(Json(row))
}

/// GET /api/admin/stats
pub async fn handle_admin_stats(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<AdminStats>, AppError> {
    user.require(&[Role::Admin])?;
    let stats: AdminStats = sqlx::query_as(
        r#"
        SELECT
            (SELECT COUNT(*) FROM users) AS total_users,
            (SELECT COUNT(*) FROM users WHERE role = 'Employee') AS employees,
            (SELECT COUNT(*) FROM users WHERE role = 'Candidate') AS candidates,
            (SELECT COUNT(*) FROM job_posts) AS jobs,
            (SELECT COUNT(*) FROM applications) AS applications,
            (SELECT COALESCE(SUM(net_salary), 0) FROM payroll) AS total_payroll
        "#,
    )
    .fetch_one(&state.db)
    .await?;
    Ok(Json(stats))
}
