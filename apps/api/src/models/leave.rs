use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT")]
pub enum LeaveType {
    #[serde(rename = "Casual Leave", alias = "Casual")]
    #[sqlx(rename = "Casual Leave")]
    Casual,
    #[serde(rename = "Sick Leave", alias = "Sick")]
    #[sqlx(rename = "Sick Leave")]
    Sick,
    #[serde(rename = "Annual Leave", alias = "Annual")]
    #[sqlx(rename = "Annual Leave")]
    Annual,
    #[serde(rename = "Maternity Leave", alias = "Maternity")]
    #[sqlx(rename = "Maternity Leave")]
    Maternity,
    #[serde(rename = "Paternity Leave", alias = "Paternity")]
    #[sqlx(rename = "Paternity Leave")]
    Paternity,
    #[serde(rename = "Emergency Leave", alias = "Emergency")]
    #[sqlx(rename = "Emergency Leave")]
    Emergency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LeaveRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: i32,
    pub reason: String,
    pub status: LeaveStatus,
    pub approved_by: Option<Uuid>,
    pub decided_at: Option<DateTime<Utc>>,
    pub applied_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LeaveDetailRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub employee_name: String,
    pub employee_email: String,
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: i32,
    pub reason: String,
    pub status: LeaveStatus,
    pub approved_by: Option<Uuid>,
    pub decided_at: Option<DateTime<Utc>>,
    pub applied_at: DateTime<Utc>,
}
