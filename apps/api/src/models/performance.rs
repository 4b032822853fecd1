use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct KpiRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub evaluation_period: String,
    pub rating: f64,
    pub kpis: Option<String>,
    pub feedback: Option<String>,
    pub goals: Option<String>,
    pub reviewed_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct KpiDetailRow {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub kpi: KpiRow,
    pub employee_name: String,
    pub employee_email: String,
}
