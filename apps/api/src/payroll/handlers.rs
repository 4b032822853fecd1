use axum::{extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::attendance::summary::month_counts;
use crate::auth::accounts::require_employee;
use crate::auth::extractor::STAFF;
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::extract::{Json, Path, Query};
use crate::models::notification::NotificationKind;
use crate::models::payroll::{PayrollRow, PayrollStatus, PayslipRow};
use crate::models::user::{Role, UserRow};
use crate::notifications::notify;
use crate::payroll::calc::{
    attendance_adjustment, compute_breakdown, compute_net, validate_amount,
    AttendanceAdjustment, SalaryBreakdown,
};
use crate::payroll::check_transition;
use crate::state::AppState;
use crate::validation::Month;

const PAYSLIP_SELECT: &str = r#"
    SELECT p.*, u.name AS employee_name, u.email AS employee_email,
           u.designation, u.department
    FROM payroll p
    JOIN users u ON u.id = p.user_id
"#;

#[derive(Debug, Deserialize)]
pub struct CalculateRequest {
    pub user_id: Uuid,
    pub month: String,
    pub basic_salary: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct CalculateResponse {
    pub user_id: Uuid,
    pub month: String,
    pub breakdown: SalaryBreakdown,
    pub attendance: AttendanceAdjustment,
    pub net_salary: f64,
}

#[derive(Debug, Deserialize)]
pub struct CreatePayrollRequest {
    pub user_id: Uuid,
    pub month: String,
    pub basic_salary: Option<f64>,
    pub bonus: Option<f64>,
    pub deductions: Option<f64>,
    #[serde(default)]
    pub use_attendance: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePayrollRequest {
    pub bonus: Option<f64>,
    pub deductions: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct PayrollQuery {
    pub user_id: Option<Uuid>,
    pub month: Option<String>,
    pub status: Option<PayrollStatus>,
}

/// The explicit basic salary wins; otherwise the employee's salary on file.
fn resolve_basic(requested: Option<f64>, employee: &UserRow) -> Result<f64, AppError> {
    let basic = requested.or(employee.salary).ok_or_else(|| {
        AppError::Validation(format!(
            "No salary on file for {}; provide basic_salary",
            employee.id
        ))
    })?;
    validate_amount("Basic salary", basic)
}

/// POST /api/payroll/calculate
pub async fn handle_calculate(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CalculateRequest>,
) -> Result<Json<CalculateResponse>, AppError> {
    user.require(STAFF)?;
    let month = Month::parse(&req.month)?;
    let employee = require_employee(&state.db, req.user_id).await?;
    let basic = resolve_basic(req.basic_salary, &employee)?;

    let counts = month_counts(&state.db, employee.id, month).await?;
    let breakdown = compute_breakdown(basic);
    let attendance = attendance_adjustment(basic, counts);
    let net_salary = compute_net(&breakdown, attendance.deduction, 0.0, 0.0);

    Ok(Json(CalculateResponse {
        user_id: employee.id,
        month: month.to_string(),
        breakdown,
        attendance,
        net_salary,
    }))
}

/// POST /api/payroll
pub async fn handle_create_payroll(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreatePayrollRequest>,
) -> Result<(StatusCode, Json<PayrollRow>), AppError> {
    user.require(STAFF)?;
    let month = Month::parse(&req.month)?;
    let employee = require_employee(&state.db, req.user_id).await?;
    let basic = resolve_basic(req.basic_salary, &employee)?;
    let bonus = validate_amount("Bonus", req.bonus.unwrap_or(0.0))?;
    let other_deductions = validate_amount("Deductions", req.deductions.unwrap_or(0.0))?;

    let breakdown = compute_breakdown(basic);
    let attendance_deduction = if req.use_attendance {
        let counts = month_counts(&state.db, employee.id, month).await?;
        attendance_adjustment(basic, counts).deduction
    } else {
        0.0
    };
    let net_salary = compute_net(&breakdown, attendance_deduction, bonus, other_deductions);

    let row: PayrollRow = sqlx::query_as(
        r#"
        INSERT INTO payroll
            (user_id, month, basic_salary, hra, conveyance, medical, lta, gross_salary,
             provident_fund, professional_tax, attendance_deduction, bonus, other_deductions,
             net_salary, generated_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
        RETURNING *
        "#,
    )
    .bind(employee.id)
    .bind(month.to_string())
    .bind(breakdown.basic)
    .bind(breakdown.hra)
    .bind(breakdown.conveyance)
    .bind(breakdown.medical)
    .bind(breakdown.lta)
    .bind(breakdown.gross)
    .bind(breakdown.provident_fund)
    .bind(breakdown.professional_tax)
    .bind(attendance_deduction)
    .bind(bonus)
    .bind(other_deductions)
    .bind(net_salary)
    .bind(user.user_id)
    .fetch_one(&state.db)
    .await
    .map_err(|e| AppError::on_unique_violation(e, "Payroll already exists for this month"))?;

    info!(
        "Generated payroll {} for {} ({}): net {:.2}",
        row.id, employee.id, row.month, row.net_salary
    );
    Ok((StatusCode::CREATED, Json(row)))
}

/// GET /api/payroll/records
pub async fn handle_list_payroll(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<PayrollQuery>,
) -> Result<Json<Vec<PayslipRow>>, AppError> {
    user.require(STAFF)?;
    let month = params
        .month
        .as_deref()
        .map(Month::parse)
        .transpose()?
        .map(|m| m.to_string());

    let sql = format!(
        "{PAYSLIP_SELECT}
         WHERE ($1::UUID IS NULL OR p.user_id = $1)
           AND ($2::TEXT IS NULL OR p.month = $2)
           AND ($3::TEXT IS NULL OR p.status = $3)
         ORDER BY p.generated_at DESC"
    );
    let rows = sqlx::query_as::<_, PayslipRow>(&sql)
        .bind(params.user_id)
        .bind(month)
        .bind(params.status)
        .fetch_all(&state.db)
        .await?;
    Ok(Json(rows))
}

/// PUT /api/payroll/:id
pub async fn handle_update_payroll(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdatePayrollRequest>,
) -> Result<Json<PayrollRow>, AppError> {
    user.require(STAFF)?;
    let mut tx = state.db.begin().await?;

    let existing: PayrollRow = sqlx::query_as("SELECT * FROM payroll WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("Payroll"))?;
    if existing.status != PayrollStatus::Generated {
        return Err(AppError::InvalidTransition(format!(
            "payroll {id} is {:?} and can no longer be edited",
            existing.status
        )));
    }

    let bonus = validate_amount("Bonus", req.bonus.unwrap_or(existing.bonus))?;
    let other_deductions =
        validate_amount("Deductions", req.deductions.unwrap_or(existing.other_deductions))?;
    let breakdown = compute_breakdown(existing.basic_salary);
    let net_salary = compute_net(
        &breakdown,
        existing.attendance_deduction,
        bonus,
        other_deductions,
    );

    let row: PayrollRow = sqlx::query_as(
        r#"
        UPDATE payroll SET bonus = $1, other_deductions = $2, net_salary = $3
        WHERE id = $4
        RETURNING *
        "#,
    )
    .bind(bonus)
    .bind(other_deductions)
    .bind(net_salary)
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    info!("Updated payroll {id}: net {:.2}", row.net_salary);
    Ok(Json(row))
}

async fn advance_payroll(
    state: &AppState,
    id: Uuid,
    target: PayrollStatus,
) -> Result<PayrollRow, AppError> {
    let mut tx = state.db.begin().await?;
    let existing: PayrollRow = sqlx::query_as("SELECT * FROM payroll WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("Payroll"))?;
    check_transition(existing.status, target)?;

    let row: PayrollRow = sqlx::query_as(
        r#"
        UPDATE payroll
        SET status = $1,
            approved_at = CASE WHEN $1 = 'Approved' THEN now() ELSE approved_at END
        WHERE id = $2
        RETURNING *
        "#,
    )
    .bind(target)
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    if target == PayrollStatus::Approved {
        notify(
            &mut *tx,
            row.user_id,
            NotificationKind::Payslip,
            "Payslip available",
            &format!("Your payslip for {} is now available.", row.month),
        )
        .await?;
    }
    tx.commit().await?;

    info!("Payroll {id} moved to {target:?}");
    Ok(row)
}

/// POST /api/payroll/:id/approve
pub async fn handle_approve_payroll(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<PayrollRow>, AppError> {
    user.require(STAFF)?;
    Ok(Json(
        advance_payroll(&state, id, PayrollStatus::Approved).await?,
    ))
}

/// POST /api/payroll/:id/pay
pub async fn handle_mark_paid(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<PayrollRow>, AppError> {
    user.require(STAFF)?;
    Ok(Json(advance_payroll(&state, id, PayrollStatus::Paid).await?))
}

/// GET /api/payroll/mine
/// Only approved or paid payslips are visible to the employee.
pub async fn handle_my_payslips(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<PayslipRow>>, AppError> {
    user.require(&[Role::Employee])?;
    let sql = format!(
        "{PAYSLIP_SELECT}
         WHERE p.user_id = $1 AND p.status IN ('Approved', 'Paid')
         ORDER BY p.month DESC"
    );
    let rows = sqlx::query_as::<_, PayslipRow>(&sql)
        .bind(user.user_id)
        .fetch_all(&state.db)
        .await?;
    Ok(Json(rows))
}

/// GET /api/payroll/payslip/:id
/// Employees see only their own payslip; anything else is reported as missing.
pub async fn handle_get_payslip(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<PayslipRow>, AppError> {
    user.require(&[Role::Employee, Role::Hr, Role::Admin])?;
    let owner = (!user.is_staff()).then_some(user.user_id);
    let sql = format!("{PAYSLIP_SELECT} WHERE p.id = $1 AND ($2::UUID IS NULL OR p.user_id = $2)");
    let row = sqlx::query_as::<_, PayslipRow>(&sql)
        .bind(id)
        .bind(owner)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::not_found("Payslip"))?;
    Ok(Json(row))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn employee(salary: Option<f64>) -> UserRow {
        UserRow {
            id: Uuid::new_v4(),
            name: "Ravi".into(),
            email: "ravi@example.com".into(),
            password_hash: String::new(),
            role: Role::Employee,
            department: Some("Engineering".into()),
            designation: None,
            phone: None,
            address: None,
            salary,
            joining_date: None,
            manager_id: None,
            employment_status: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_resolve_basic_prefers_explicit_amount() {
        assert_eq!(
            resolve_basic(Some(40_000.0), &employee(Some(50_000.0))).unwrap(),
            40_000.0
        );
    }

    #[test]
    fn test_resolve_basic_falls_back_to_salary_on_file() {
        assert_eq!(
            resolve_basic(None, &employee(Some(50_000.0))).unwrap(),
            50_000.0
        );
    }

    #[test]
    fn test_resolve_basic_requires_some_salary() {
        assert!(resolve_basic(None, &employee(None)).is_err());
        assert!(resolve_basic(Some(-1.0), &employee(None)).is_err());
    }
}
