use axum::{extract::Path, Extension, Json};
use serde::Serialize;
use sqlx::PgPool;
use woodpecker_core::progress::Progress;

use crate::auth::middleware::AuthUser;
use crate::db::progress;
use crate::error::AppError;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressStats {
    pub total_attempted: i64,
    pub total_solved: i64,
    pub average_score: f64,
}

/// GET /api/progress/today
pub async fn get_stats(
    Extension(pool): Extension<PgPool>,
    user: AuthUser,
) -> Result<Json<ProgressStats>, AppError> {
    let totals = progress::totals(&pool, user.id).await?;

    Ok(Json(ProgressStats {
        total_attempted: totals.total_attempted,
        total_solved: totals.total_solved,
        average_score: totals.average_score,
    }))
}

/// GET /api/progress/{puzzle_id}
pub async fn get_puzzle_progress(
    Extension(pool): Extension<PgPool>,
    user: AuthUser,
    Path(puzzle_id): Path<String>,
) -> Result<Json<Progress>, AppError> {
    progress::get_progress(&pool, user.id, &puzzle_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No progress for puzzle {puzzle_id}")))
}
