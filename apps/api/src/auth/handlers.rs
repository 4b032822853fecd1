use axum::{extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::accounts::{create_user, find_by_email, normalize_email, require_user, NewUser};
use crate::auth::jwt::issue_token;
use crate::auth::password::{hash_password, validate_password, verify_password};
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::extract::Json;
use crate::models::user::{Role, UserRow};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserRow,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Self-service sign-up is limited to job seekers and employees.
fn registrable_role(requested: Option<Role>) -> Result<Role, AppError> {
    match requested.unwrap_or(Role::Candidate) {
        role @ (Role::Candidate | Role::Employee) => Ok(role),
        other => Err(AppError::Validation(format!(
            "{} accounts are created by an administrator",
            other.as_str()
        ))),
    }
}

/// Unknown accounts and wrong passwords answer the same way.
fn authenticate(account: Option<UserRow>, password: &str) -> Result<UserRow, AppError> {
    let Some(user) = account else {
        warn!("Login attempt for unknown account");
        return Err(AppError::InvalidCredentials);
    };
    if !verify_password(password, &user.password_hash) {
        warn!(user_id = %user.id, "Login attempt with wrong password");
        return Err(AppError::InvalidCredentials);
    }
    if user.is_exited() {
        return Err(AppError::Forbidden);
    }
    Ok(user)
}

/// POST /api/auth/register
pub async fn handle_register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserRow>), AppError> {
    let role = registrable_role(req.role)?;
    let mut conn = state.db.acquire().await?;
    let user = create_user(
        &mut *conn,
        NewUser::basic(&req.name, &req.email, &req.password, role),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /api/auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let email = normalize_email(&req.email);
    if email.is_empty() || req.password.is_empty() {
        return Err(AppError::Validation(
            "Email and password required".to_string(),
        ));
    }

    let user = authenticate(find_by_email(&state.db, &email).await?, &req.password)?;

    let token = issue_token(user.id, &user.email, user.role, &state.auth)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to issue token: {e}")))?;
    info!(user_id = %user.id, "User logged in");
    Ok(Json(LoginResponse { token, user }))
}

/// GET /api/auth/me
pub async fn handle_me(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<UserRow>, AppError> {
    Ok(Json(require_user(&state.db, user.user_id).await?))
}

/// POST /api/auth/change-password
pub async fn handle_change_password(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<StatusCode, AppError> {
    let account = require_user(&state.db, user.user_id).await?;
    if !verify_password(&req.current_password, &account.password_hash) {
        return Err(AppError::Validation(
            "Current password is incorrect".to_string(),
        ));
    }
    validate_password(&req.new_password)?;
    let new_hash = hash_password(&req.new_password)?;

    sqlx::query("UPDATE users SET password_hash = $1, updated_at = now() WHERE id = $2")
        .bind(new_hash)
        .bind(user.user_id)
        .execute(&state.db)
        .await?;

    info!(user_id = %user.user_id, "Password changed");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::EmploymentStatus;
    use chrono::Utc;
    use uuid::Uuid;

    fn account(password: &str, status: Option<EmploymentStatus>) -> UserRow {
        UserRow {
            id: Uuid::new_v4(),
            name: "Meera".into(),
            email: "meera@example.com".into(),
            password_hash: hash_password(password).unwrap(),
            role: Role::Employee,
            department: None,
            designation: None,
            phone: None,
            address: None,
            salary: None,
            joining_date: None,
            manager_id: None,
            employment_status: status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_authenticate_rejects_unknown_account_and_wrong_password() {
        assert!(matches!(
            authenticate(None, "whatever1"),
            Err(AppError::InvalidCredentials)
        ));
        let user = account("s3cret-pass", Some(EmploymentStatus::Active));
        assert!(matches!(
            authenticate(Some(user.clone()), "wrong-pass"),
            Err(AppError::InvalidCredentials)
        ));
        assert_eq!(authenticate(Some(user.clone()), "s3cret-pass").unwrap().id, user.id);
    }

    #[test]
    fn test_authenticate_blocks_exited_employee() {
        let user = account("s3cret-pass", Some(EmploymentStatus::Exited));
        assert!(matches!(
            authenticate(Some(user), "s3cret-pass"),
            Err(AppError::Forbidden)
        ));
    }

    #[test]
    fn test_registrable_role_defaults_to_candidate() {
        assert_eq!(registrable_role(None).unwrap(), Role::Candidate);
        assert_eq!(
            registrable_role(Some(Role::Employee)).unwrap(),
            Role::Employee
        );
    }

    #[test]
    fn test_privileged_roles_cannot_self_register() {
        assert!(registrable_role(Some(Role::Admin)).is_err());
        assert!(registrable_role(Some(Role::Hr)).is_err());
    }
}
