use axum::extract::State;
use serde::Deserialize;
use tracing::info;

use crate::auth::extractor::STAFF;
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::extract::Json;
use crate::models::recruitment::{CandidateProfileRow, CandidateSummaryRow};
use crate::models::user::Role;
use crate::state::AppState;
use crate::validation::optional_text;

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub phone: Option<String>,
    pub address: Option<String>,
    pub skills: Option<Vec<String>>,
    pub experience: Option<String>,
    pub education: Option<String>,
}

/// GET /api/candidates/profile
pub async fn handle_get_profile(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<CandidateProfileRow>, AppError> {
    user.require(&[Role::Candidate])?;
    let profile: CandidateProfileRow = sqlx::query_as(
        r#"
        INSERT INTO candidate_profiles (user_id) VALUES ($1)
        ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
        RETURNING *
        "#,
    )
    .bind(user.user_id)
    .fetch_one(&state.db)
    .await?;
    Ok(Json(profile))
}

/// PUT /api/candidates/profile
/// Fields left out of the request keep their stored value.
pub async fn handle_update_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<CandidateProfileRow>, AppError> {
    user.require(&[Role::Candidate])?;
    let skills = req.skills.map(|skills| {
        skills
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
    });

    let profile: CandidateProfileRow = sqlx::query_as(
        r#"
        INSERT INTO candidate_profiles (user_id, phone, address, skills, experience, education)
        VALUES ($1, $2, $3, COALESCE($4, '{}'), $5, $6)
        ON CONFLICT (user_id) DO UPDATE SET
            phone = COALESCE($2, candidate_profiles.phone),
            address = COALESCE($3, candidate_profiles.address),
            skills = COALESCE($4, candidate_profiles.skills),
            experience = COALESCE($5, candidate_profiles.experience),
            education = COALESCE($6, candidate_profiles.education),
            updated_at = now()
        RETURNING *
        "#,
    )
    .bind(user.user_id)
    .bind(optional_text(req.phone))
    .bind(optional_text(req.address))
    .bind(skills)
    .bind(optional_text(req.experience))
    .bind(optional_text(req.education))
    .fetch_one(&state.db)
    .await?;

    info!(user_id = %user.user_id, "Candidate profile updated");
    Ok(Json(profile))
}

/// GET /api/candidates
pub async fn handle_list_candidates(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<CandidateSummaryRow>>, AppError> {
    user.require(STAFF)?;
    let rows = sqlx::query_as::<_, CandidateSummaryRow>(
        r#"
        SELECT u.id AS user_id, u.name, u.email, p.phone,
               COALESCE(p.skills, '{}') AS skills, p.experience, p.education, p.resume_key
        FROM users u
        LEFT JOIN candidate_profiles p ON p.user_id = u.id
        WHERE u.role = 'Candidate'
        ORDER BY u.created_at DESC
        "#,
    )
    .fetch_all(&state.db)
    .await?;
    Ok(Json(rows))
}
