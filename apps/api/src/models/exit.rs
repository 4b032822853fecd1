use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT")]
pub enum ResignationStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT")]
pub enum ExitStatus {
    Initiated,
    Completed,
}

/// Departments that must sign off before an employee can exit.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT")]
pub enum ClearanceDepartment {
    #[serde(alias = "it")]
    IT,
    #[serde(alias = "finance")]
    Finance,
    #[serde(alias = "hr")]
    HR,
    #[serde(alias = "manager")]
    Manager,
}

impl ClearanceDepartment {
    pub const ALL: [ClearanceDepartment; 4] = [
        ClearanceDepartment::IT,
        ClearanceDepartment::Finance,
        ClearanceDepartment::HR,
        ClearanceDepartment::Manager,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT")]
pub enum ClearanceStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResignationRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub resignation_date: NaiveDate,
    pub reason: String,
    pub feedback: Option<String>,
    pub status: ResignationStatus,
    pub decided_by: Option<Uuid>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResignationDetailRow {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub resignation: ResignationRow,
    pub employee_name: String,
    pub employee_email: String,
    pub department: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExitProcessRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub resignation_id: Option<Uuid>,
    pub reason: String,
    pub last_working_day: NaiveDate,
    pub handover_notes: Option<String>,
    pub status: ExitStatus,
    pub initiated_by: Uuid,
    pub initiated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ClearanceRow {
    pub id: Uuid,
    pub exit_process_id: Uuid,
    pub user_id: Uuid,
    pub department: ClearanceDepartment,
    pub status: ClearanceStatus,
    pub remarks: Option<String>,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
}
