use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::{PgConnection, PgExecutor};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::password::{hash_password, validate_password};
use crate::errors::AppError;
use crate::models::user::{EmploymentStatus, Role, UserRow};
use crate::validation::require_text;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("valid email regex")
});

/// Parameters for creating any kind of account.
pub struct NewUser<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub role: Role,
    pub department: Option<&'a str>,
    pub designation: Option<&'a str>,
    pub salary: Option<f64>,
    pub joining_date: Option<NaiveDate>,
    pub manager_id: Option<Uuid>,
}

impl<'a> NewUser<'a> {
    pub fn basic(name: &'a str, email: &'a str, password: &'a str, role: Role) -> Self {
        NewUser {
            name,
            email,
            password,
            role,
            department: None,
            designation: None,
            salary: None,
            joining_date: None,
            manager_id: None,
        }
    }
}

pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

pub fn validate_email(email: &str) -> Result<(), AppError> {
    if !EMAIL_RE.is_match(email) {
        return Err(AppError::Validation(format!("Invalid email address '{email}'")));
    }
    Ok(())
}

pub fn validate_salary(salary: Option<f64>) -> Result<(), AppError> {
    match salary {
        Some(s) if !s.is_finite() || s < 0.0 => Err(AppError::Validation(
            "Salary must be a non-negative amount".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Inserts a user (and, for candidates, an empty profile).
/// Employees start out `Active`.
pub async fn create_user(conn: &mut PgConnection, new: NewUser<'_>) -> Result<UserRow, AppError> {
    let name = require_text("Name", new.name)?;
    let email = normalize_email(new.email);
    validate_email(&email)?;
    validate_password(new.password)?;
    validate_salary(new.salary)?;

    if find_by_email(&mut *conn, &email).await?.is_some() {
        return Err(AppError::Conflict("User already exists".to_string()));
    }

    let password_hash = hash_password(new.password)?;
    let employment_status = (new.role == Role::Employee).then_some(EmploymentStatus::Active);

    let user: UserRow = sqlx::query_as(
        r#"
        INSERT INTO users
            (name, email, password_hash, role, department, designation,
             salary, joining_date, manager_id, employment_status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING *
        "#,
    )
    .bind(&name)
    .bind(&email)
    .bind(&password_hash)
    .bind(new.role)
    .bind(new.department)
    .bind(new.designation)
    .bind(new.salary)
    .bind(new.joining_date)
    .bind(new.manager_id)
    .bind(employment_status)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| AppError::on_unique_violation(e, "User already exists"))?;

    if user.role == Role::Candidate {
        sqlx::query("INSERT INTO candidate_profiles (user_id) VALUES ($1) ON CONFLICT DO NOTHING")
            .bind(user.id)
            .execute(&mut *conn)
            .await?;
    }

    info!("Created {} account {}", user.role.as_str(), user.id);
    Ok(user)
}

pub async fn find_by_email<'e>(
    executor: impl PgExecutor<'e>,
    email: &str,
) -> Result<Option<UserRow>, AppError> {
    Ok(sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(executor)
        .await?)
}

pub async fn find_user<'e>(
    executor: impl PgExecutor<'e>,
    user_id: Uuid,
) -> Result<Option<UserRow>, AppError> {
    Ok(sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(executor)
        .await?)
}

pub async fn require_user<'e>(
    executor: impl PgExecutor<'e>,
    user_id: Uuid,
) -> Result<UserRow, AppError> {
    find_user(executor, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User"))
}

/// Loads a user and checks that it is an employee account.
pub async fn require_employee<'e>(
    executor: impl PgExecutor<'e>,
    user_id: Uuid,
) -> Result<UserRow, AppError> {
    let user = require_user(executor, user_id).await?;
    if user.role != Role::Employee {
        return Err(AppError::Validation(format!(
            "User {user_id} is not an employee"
        )));
    }
    Ok(user)
}

/// The token role must still match a live employee account.
pub fn check_active_employee(account: &UserRow) -> Result<(), AppError> {
    if account.role != Role::Employee || account.is_exited() {
        warn!(
            user_id = %account.id,
            role = account.role.as_str(),
            "Token no longer matches an active employee account"
        );
        return Err(AppError::Forbidden);
    }
    Ok(())
}

/// Re-reads the caller before employee self-service writes.
pub async fn require_active_employee<'e>(
    executor: impl PgExecutor<'e>,
    user_id: Uuid,
) -> Result<UserRow, AppError> {
    let account = require_user(executor, user_id).await?;
    check_active_employee(&account)?;
    Ok(account)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn account(role: Role, status: Option<EmploymentStatus>) -> UserRow {
        UserRow {
            id: Uuid::new_v4(),
            name: "Tara".into(),
            email: "tara@example.com".into(),
            password_hash: String::new(),
            role,
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
    fn test_active_employee_check() {
        let active = account(Role::Employee, Some(EmploymentStatus::Active));
        assert!(check_active_employee(&active).is_ok());
        let leaving = account(Role::Employee, Some(EmploymentStatus::ExitProcess));
        assert!(check_active_employee(&leaving).is_ok());

        let exited = account(Role::Employee, Some(EmploymentStatus::Exited));
        assert!(matches!(check_active_employee(&exited), Err(AppError::Forbidden)));
        let candidate = account(Role::Candidate, None);
        assert!(matches!(check_active_employee(&candidate), Err(AppError::Forbidden)));
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Jane.Doe@Example.COM "), "jane.doe@example.com");
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("jane@example.com").is_ok());
        assert!(validate_email("jane.doe+hr@mail.example.io").is_ok());
        assert!(validate_email("jane@").is_err());
        assert!(validate_email("no-at-sign.com").is_err());
        assert!(validate_email("").is_err());
    }

    #[test]
    fn test_validate_salary() {
        assert!(validate_salary(None).is_ok());
        assert!(validate_salary(Some(50_000.0)).is_ok());
        assert!(validate_salary(Some(-1.0)).is_err());
        assert!(validate_salary(Some(f64::NAN)).is_err());
    }
}
