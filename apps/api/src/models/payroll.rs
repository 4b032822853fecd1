use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT")]
pub enum PayrollStatus {
    Generated,
    Approved,
    Paid,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PayrollRow {
    pub id: Uuid,
    pub user_id: Uuid,
    /// `YYYY-MM`
    pub month: String,
    pub basic_salary: f64,
    pub hra: f64,
    pub conveyance: f64,
    pub medical: f64,
    pub lta: f64,
    pub gross_salary: f64,
    pub provident_fund: f64,
    pub professional_tax: f64,
    pub attendance_deduction: f64,
    pub bonus: f64,
    pub other_deductions: f64,
    pub net_salary: f64,
    pub status: PayrollStatus,
    pub generated_by: Uuid,
    pub generated_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
}

/// Payroll row joined with the employee's identity, used for listings and payslips.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PayslipRow {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub payroll: PayrollRow,
    pub employee_name: String,
    pub employee_email: String,
    pub designation: Option<String>,
    pub department: Option<String>,
}
