use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT")]
pub enum Role {
    Admin,
    #[serde(rename = "HR")]
    #[sqlx(rename = "HR")]
    Hr,
    Employee,
    Candidate,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Hr => "HR",
            Role::Employee => "Employee",
            Role::Candidate => "Candidate",
        }
    }
}

/// Lifecycle state of an employee account. Candidates, HR and Admin users carry none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT")]
pub enum EmploymentStatus {
    Active,
    Inactive,
    #[serde(rename = "Exit Process")]
    #[sqlx(rename = "Exit Process")]
    ExitProcess,
    Exited,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    pub department: Option<String>,
    pub designation: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub salary: Option<f64>,
    pub joining_date: Option<NaiveDate>,
    pub manager_id: Option<Uuid>,
    pub employment_status: Option<EmploymentStatus>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRow {
    pub fn is_exited(&self) -> bool {
        self.employment_status == Some(EmploymentStatus::Exited)
    }
}
