use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT")]
pub enum InterviewMode {
    Online,
    Offline,
    Phone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT")]
pub enum InterviewStatus {
    Scheduled,
    Completed,
    Cancelled,
    #[serde(rename = "No Show")]
    #[sqlx(rename = "No Show")]
    NoShow,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InterviewRow {
    pub id: Uuid,
    pub application_id: Uuid,
    pub mode: InterviewMode,
    pub interview_date: NaiveDate,
    pub interview_time: NaiveTime,
    pub interviewer: Option<String>,
    pub status: InterviewStatus,
    pub feedback: Option<String>,
    pub rating: Option<i32>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Interview joined with candidate and job for listings.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InterviewDetailRow {
    pub id: Uuid,
    pub application_id: Uuid,
    pub candidate_id: Uuid,
    pub candidate_name: String,
    pub candidate_email: String,
    pub job_title: String,
    pub mode: InterviewMode,
    pub interview_date: NaiveDate,
    pub interview_time: NaiveTime,
    pub interviewer: Option<String>,
    pub status: InterviewStatus,
    pub feedback: Option<String>,
    pub rating: Option<i32>,
}
