use axum::{
    extract::{Path, Query},
    Extension, Json,
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use woodpecker_core::plan::{next_due, start_of_day};
use woodpecker_core::progress::{AttemptSummary, ProgressUpdate};
use woodpecker_core::puzzle::{is_valid_difficulty, side_to_move, Puzzle};
use woodpecker_core::{grade_first_move_or_full, grade_line, BranchGrade, GradeResult};

use crate::auth::middleware::AuthUser;
use crate::config::Config;
use crate::db::{attempts, progress, puzzles};
use crate::error::AppError;
use crate::scheduler;

async fn load_puzzle(pool: &PgPool, puzzle_id: &str) -> Result<Puzzle, AppError> {
    if puzzle_id.trim().is_empty() {
        return Err(AppError::BadRequest("puzzleId is required".into()));
    }

    puzzles::get_puzzle(pool, puzzle_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Puzzle {puzzle_id} not found")))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeLineRequest {
    #[serde(default)]
    pub puzzle_id: String,
    #[serde(default)]
    pub typed_sans: Vec<String>,
    pub time_ms: Option<i32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeLineResponse {
    #[serde(flatten)]
    pub grade: GradeResult,
    pub required_ticks: Vec<String>,
    pub attempts: i32,
    pub solved: bool,
    /// Set when the attempt was written into a running session.
    pub attempt_id: Option<i64>,
}

/// POST /api/puzzles/grade-line
/// Grade a typed line against the puzzle's flat solution and record the attempt.
pub async fn grade_line_handler(
    Extension(pool): Extension<PgPool>,
    user: AuthUser,
    Json(req): Json<GradeLineRequest>,
) -> Result<Json<GradeLineResponse>, AppError> {
    let puzzle = load_puzzle(&pool, &req.puzzle_id).await?;
    let grade = grade_line(puzzle.solution.flat_line(), &req.typed_sans);

    // Nothing typed: a zero grade, nothing recorded.
    if req.typed_sans.is_empty() {
        let existing = progress::get_progress(&pool, user.id, &puzzle.id).await?;
        return Ok(Json(GradeLineResponse {
            grade,
            required_ticks: puzzle.ticks,
            attempts: existing.as_ref().map(|p| p.attempts).unwrap_or(0),
            solved: existing.is_some_and(|p| p.solved_at.is_some()),
            attempt_id: None,
        }));
    }

    let update = ProgressUpdate::from_grade(
        req.typed_sans.clone(),
        &grade,
        puzzle.solution.solved_threshold(),
    );
    let summary = AttemptSummary::from_grade(&grade, &update, req.time_ms);

    // Progress and attempt land together or not at all.
    let mut tx = pool.begin().await?;
    let recorded = progress::record(&mut *tx, user.id, &puzzle.id, &update).await?;
    let attempt_id = attempts::record_attempt(&mut *tx, user.id, &puzzle.id, &summary).await?;
    tx.commit().await?;

    tracing::debug!(
        user_id = user.id,
        puzzle_id = %puzzle.id,
        score = grade.score,
        depth = grade.depth_matched,
        ?attempt_id,
        "Line graded"
    );

    Ok(Json(GradeLineResponse {
        grade,
        required_ticks: puzzle.ticks,
        attempts: recorded.attempts,
        solved: recorded.solved_at.is_some(),
        attempt_id,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeRequest {
    #[serde(default)]
    pub puzzle_id: String,
    #[serde(default)]
    pub played_sans: Vec<String>,
}

/// POST /api/puzzles/grade
/// Legacy first-move / full-line grading over the branching solution.
pub async fn grade_handler(
    Extension(pool): Extension<PgPool>,
    Json(req): Json<GradeRequest>,
) -> Result<Json<BranchGrade>, AppError> {
    let puzzle = load_puzzle(&pool, &req.puzzle_id).await?;
    Ok(Json(grade_first_move_or_full(&puzzle.solution, &req.played_sans)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextQuery {
    pub difficulty: Option<String>,
    pub puzzle_id: Option<String>,
}

/// GET /api/puzzles/next?difficulty=easy&puzzleId=...
/// A requested puzzle, else the next one due today, else the first of the difficulty.
pub async fn next_puzzle(
    Extension(pool): Extension<PgPool>,
    user: AuthUser,
    Query(q): Query<NextQuery>,
) -> Result<Json<puzzles::PuzzleSummary>, AppError> {
    let difficulty = q.difficulty.as_deref().filter(|d| !d.is_empty());
    if let Some(d) = difficulty {
        if !is_valid_difficulty(d) {
            return Err(AppError::BadRequest(format!("Unknown difficulty: {d}")));
        }
    }

    if let Some(id) = q.puzzle_id.as_deref().filter(|id| !id.is_empty()) {
        return puzzles::get_summary(&pool, id, difficulty)
            .await?
            .map(Json)
            .ok_or_else(|| AppError::NotFound(format!("Puzzle {id} not found")));
    }

    let plan = scheduler::ensure_today_plan(&pool, user.id).await?;
    let attempted = progress::attempted_since(&pool, user.id, start_of_day(&Local::now())).await?;
    if let Some(id) = next_due(&plan, &attempted) {
        if let Some(summary) = puzzles::get_summary(&pool, id, difficulty).await? {
            return Ok(Json(summary));
        }
    }

    if let Some(d) = difficulty {
        if let Some(summary) = puzzles::first_by_difficulty(&pool, d).await? {
            return Ok(Json(summary));
        }
    }

    Err(AppError::NotFound("No puzzle available".into()))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolutionTextResponse {
    pub puzzle_id: String,
    pub solution_text: String,
}

/// GET /api/puzzles/solution-text/{puzzle_id}
pub async fn solution_text(
    Extension(pool): Extension<PgPool>,
    Path(puzzle_id): Path<String>,
) -> Result<Json<SolutionTextResponse>, AppError> {
    let text = puzzles::get_solution_text(&pool, &puzzle_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No solution text for puzzle {puzzle_id}")))?;

    Ok(Json(SolutionTextResponse {
        puzzle_id,
        solution_text: text,
    }))
}

#[derive(Deserialize)]
pub struct UploadBody {
    pub puzzles: Vec<Puzzle>,
}

/// POST /api/admin/puzzles/upload
/// Upsert a puzzle batch; every FEN and difficulty is checked before anything is written.
/// Puzzles uploaded without ticks take them from the solution's tick nodes.
/// Only accounts listed in `ADMIN_EMAILS` may upload.
pub async fn upload_puzzles(
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Config>,
    user: AuthUser,
    Json(mut body): Json<UploadBody>,
) -> Result<Json<JsonValue>, AppError> {
    if !config.is_admin(&user.email) {
        tracing::warn!(user_id = user.id, "Puzzle upload refused");
        return Err(AppError::Forbidden("Admin access required".into()));
    }

    for puzzle in &mut body.puzzles {
        if puzzle.id.trim().is_empty() {
            return Err(AppError::BadRequest("Puzzle id is required".into()));
        }
        if !is_valid_difficulty(&puzzle.difficulty) {
            return Err(AppError::BadRequest(format!(
                "Puzzle {}: unknown difficulty {}",
                puzzle.id, puzzle.difficulty
            )));
        }
        side_to_move(&puzzle.fen)?;
        if puzzle.ticks.is_empty() {
            puzzle.ticks = puzzle.solution.tick_sans();
        }
    }

    let count = puzzles::upsert_puzzles(&pool, &body.puzzles).await?;
    tracing::info!(user_id = user.id, count, "Puzzles uploaded");

    Ok(Json(serde_json::json!({ "uploaded": count })))
}
