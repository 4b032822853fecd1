use axum::{extract::State, http::StatusCode};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::accounts::require_employee;
use crate::auth::extractor::STAFF;
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::extract::{Json, Query};
use crate::models::performance::{KpiDetailRow, KpiRow};
use crate::models::user::Role;
use crate::performance::rating::{compute_stats, validate_rating, PerformanceStats};
use crate::state::AppState;
use crate::validation::{optional_text, require_text};

#[derive(Debug, Deserialize)]
pub struct CreateReviewRequest {
    pub user_id: Uuid,
    pub evaluation_period: String,
    pub rating: f64,
    pub kpis: Option<String>,
    pub feedback: Option<String>,
    pub goals: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewQuery {
    pub user_id: Option<Uuid>,
}

/// POST /api/performance
pub async fn handle_create_review(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<KpiRow>), AppError> {
    user.require(STAFF)?;
    let period = require_text("Evaluation period", &req.evaluation_period)?;
    let rating = validate_rating(req.rating)?;
    let employee = require_employee(&state.db, req.user_id).await?;

    let row: KpiRow = sqlx::query_as(
        r#"
        INSERT INTO kpi (user_id, evaluation_period, rating, kpis, feedback, goals, reviewed_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(employee.id)
    .bind(&period)
    .bind(rating)
    .bind(optional_text(req.kpis))
    .bind(optional_text(req.feedback))
    .bind(optional_text(req.goals))
    .bind(user.user_id)
    .fetch_one(&state.db)
    .await?;

    info!(
        "Review {} recorded for {} ({}): {:.1}",
        row.id, employee.id, row.evaluation_period, row.rating
    );
    Ok((StatusCode::CREATED, Json(row)))
}

/// GET /api/performance
pub async fn handle_list_reviews(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<ReviewQuery>,
) -> Result<Json<Vec<KpiDetailRow>>, AppError> {
    user.require(STAFF)?;
    let rows = sqlx::query_as::<_, KpiDetailRow>(
        r#"
        SELECT k.*, u.name AS employee_name, u.email AS employee_email
        FROM kpi k
        JOIN users u ON u.id = k.user_id
        WHERE ($1::UUID IS NULL OR k.user_id = $1)
        ORDER BY k.created_at DESC
        "#,
    )
    .bind(params.user_id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(rows))
}

/// GET /api/performance/mine
pub async fn handle_my_reviews(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<KpiRow>>, AppError> {
    user.require(&[Role::Employee])?;
    let rows =
        sqlx::query_as::<_, KpiRow>("SELECT * FROM kpi WHERE user_id = $1 ORDER BY created_at DESC")
            .bind(user.user_id)
            .fetch_all(&state.db)
            .await?;
    Ok(Json(rows))
}

/// GET /api/performance/stats
pub async fn handle_performance_stats(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<PerformanceStats>, AppError> {
    user.require(STAFF)?;
    let ratings: Vec<f64> = sqlx::query_scalar("SELECT rating FROM kpi")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(compute_stats(&ratings)))
}
