use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT")]
pub enum JobStatus {
    #[serde(alias = "Active")]
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT")]
pub enum ApplicationStatus {
    Pending,
    Shortlisted,
    Interview,
    Hired,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "Pending",
            ApplicationStatus::Shortlisted => "Shortlisted",
            ApplicationStatus::Interview => "Interview",
            ApplicationStatus::Hired => "Hired",
            ApplicationStatus::Rejected => "Rejected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobPostRow {
    pub id: Uuid,
    pub title: String,
    pub department: String,
    pub description: String,
    pub skills: Vec<String>,
    pub deadline: NaiveDate,
    pub status: JobStatus,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApplicationRow {
    pub id: Uuid,
    pub job_id: Uuid,
    pub candidate_id: Uuid,
    pub resume_key: Option<String>,
    pub cover_letter: Option<String>,
    pub parsed_skills: Vec<String>,
    pub experience_years: i32,
    pub status: ApplicationStatus,
    pub applied_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Application as seen by recruiters, joined with the candidate's identity and the job title.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApplicationDetailRow {
    pub id: Uuid,
    pub job_id: Uuid,
    pub job_title: String,
    pub candidate_id: Uuid,
    pub candidate_name: String,
    pub candidate_email: String,
    pub resume_key: Option<String>,
    pub cover_letter: Option<String>,
    pub parsed_skills: Vec<String>,
    pub experience_years: i32,
    pub status: ApplicationStatus,
    pub applied_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CandidateProfileRow {
    pub user_id: Uuid,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub skills: Vec<String>,
    pub experience: Option<String>,
    pub education: Option<String>,
    pub resume_key: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Profile listing for recruiters.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CandidateSummaryRow {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub skills: Vec<String>,
    pub experience: Option<String>,
    pub education: Option<String>,
    pub resume_key: Option<String>,
}
