use axum::{
    extract::{Path, Query},
    Extension, Json,
};
use chrono::Local;
use serde::Deserialize;
use sqlx::PgPool;
use validator::Validate;
use woodpecker_core::cycle::{Cycle, CycleStatus, Session};
use woodpecker_core::puzzle::{is_valid_difficulty, DIFFICULTIES};

use crate::auth::middleware::AuthUser;
use crate::db::{cycles, puzzles, sessions, sets};
use crate::error::AppError;
use crate::scheduler;

async fn owned_set(pool: &PgPool, user_id: i64, set_id: i64) -> Result<sets::PuzzleSet, AppError> {
    sets::get_owned_set(pool, user_id, set_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Set {set_id} not found")))
}

async fn owned_cycle(pool: &PgPool, user_id: i64, cycle_id: i64) -> Result<Cycle, AppError> {
    cycles::get_owned_cycle(pool, user_id, cycle_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Cycle {cycle_id} not found")))
}

/// Rebuild today's plan after a cycle change. The change is already
/// committed, so a failed rebuild is only logged.
async fn rebuild_plan(pool: &PgPool, user_id: i64) {
    if let Err(e) = scheduler::build_plan_for_user(pool, user_id, &Local::now()).await {
        let chain = format!("{e:#}");
        tracing::warn!(user_id, error = %chain, "Plan rebuild after cycle change failed");
    }
}

fn difficulty_rank(difficulty: &str) -> Option<usize> {
    DIFFICULTIES.iter().position(|d| *d == difficulty)
}

/// GET /api/trainer/sets
pub async fn list_sets(
    Extension(pool): Extension<PgPool>,
    user: AuthUser,
) -> Result<Json<Vec<sets::PuzzleSet>>, AppError> {
    Ok(Json(sets::list_sets(&pool, user.id).await?))
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSetBody {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub description: String,
    pub difficulty_min: String,
    pub difficulty_max: String,
    #[validate(range(min = 1, max = 1000))]
    pub size: i64,
}

/// POST /api/trainer/sets
/// Create a set from the first `size` puzzles (by ID) in the difficulty range.
pub async fn create_set(
    Extension(pool): Extension<PgPool>,
    user: AuthUser,
    Json(body): Json<CreateSetBody>,
) -> Result<Json<sets::PuzzleSet>, AppError> {
    body.validate()?;

    for d in [&body.difficulty_min, &body.difficulty_max] {
        if !is_valid_difficulty(d) {
            return Err(AppError::BadRequest(format!("Unknown difficulty: {d}")));
        }
    }
    if difficulty_rank(&body.difficulty_min) > difficulty_rank(&body.difficulty_max) {
        return Err(AppError::BadRequest(
            "difficultyMin must not be harder than difficultyMax".into(),
        ));
    }

    let puzzle_ids =
        puzzles::ids_in_difficulty_range(&pool, &body.difficulty_min, &body.difficulty_max, body.size)
            .await?;
    if puzzle_ids.is_empty() {
        return Err(AppError::BadRequest("No puzzles in that difficulty range".into()));
    }

    let new_set = sets::NewSet {
        name: body.name.trim(),
        description: &body.description,
        difficulty_min: &body.difficulty_min,
        difficulty_max: &body.difficulty_max,
    };
    let set = sets::create_set(&pool, user.id, &new_set, &puzzle_ids).await?;
    tracing::info!(user_id = user.id, set_id = set.id, size = puzzle_ids.len(), "Set created");

    Ok(Json(set))
}

/// GET /api/trainer/sets/{set_id}/puzzles
pub async fn get_set_puzzles(
    Extension(pool): Extension<PgPool>,
    user: AuthUser,
    Path(set_id): Path<i64>,
) -> Result<Json<Vec<puzzles::PuzzleSummary>>, AppError> {
    owned_set(&pool, user.id, set_id).await?;
    Ok(Json(sets::puzzles_in_set(&pool, set_id).await?))
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCycleBody {
    pub set_id: i64,
    #[validate(range(min = 1, max = 365, message = "targetDays must be 1-365"))]
    pub target_days: i32,
    pub status: Option<CycleStatus>,
}

/// POST /api/trainer/cycles
pub async fn create_cycle(
    Extension(pool): Extension<PgPool>,
    user: AuthUser,
    Json(body): Json<CreateCycleBody>,
) -> Result<Json<Cycle>, AppError> {
    body.validate()?;
    owned_set(&pool, user.id, body.set_id).await?;

    let status = body.status.unwrap_or(CycleStatus::Planned);
    if !matches!(status, CycleStatus::Planned | CycleStatus::Active) {
        return Err(AppError::BadRequest(format!(
            "A new cycle cannot start as {status}"
        )));
    }

    let cycle = cycles::create_cycle(&pool, body.set_id, body.target_days, status)
        .await?
        .ok_or_else(|| AppError::Conflict("Set already has an active cycle".into()))?;

    if cycle.status == CycleStatus::Active {
        rebuild_plan(&pool, user.id).await;
    }

    Ok(Json(cycle))
}

#[derive(Deserialize)]
pub struct ActiveCycleQuery {
    pub set_id: i64,
}

/// GET /api/trainer/cycles/active?set_id=1
pub async fn get_active_cycle(
    Extension(pool): Extension<PgPool>,
    user: AuthUser,
    Query(q): Query<ActiveCycleQuery>,
) -> Result<Json<Cycle>, AppError> {
    owned_set(&pool, user.id, q.set_id).await?;

    cycles::get_active(&pool, q.set_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Set {} has no active cycle", q.set_id)))
}

#[derive(Deserialize)]
pub struct UpdateCycleBody {
    pub status: String,
}

/// PUT /api/trainer/cycles/{cycle_id}
/// Change a cycle's status along a legal transition.
pub async fn update_cycle(
    Extension(pool): Extension<PgPool>,
    user: AuthUser,
    Path(cycle_id): Path<i64>,
    Json(body): Json<UpdateCycleBody>,
) -> Result<Json<Cycle>, AppError> {
    let next: CycleStatus = body.status.parse()?;
    let cycle = owned_cycle(&pool, user.id, cycle_id).await?;

    if cycle.status == next {
        return Ok(Json(cycle));
    }
    if !cycle.status.can_transition_to(next) {
        return Err(AppError::BadRequest(format!(
            "Cannot move cycle from {} to {next}",
            cycle.status
        )));
    }

    let updated = cycles::transition(&pool, cycle.id, cycle.status, next)
        .await?
        .ok_or_else(|| {
            AppError::Conflict("Cycle changed meanwhile or set already has an active cycle".into())
        })?;
    tracing::info!(user_id = user.id, cycle_id, status = %next, "Cycle status changed");
    rebuild_plan(&pool, user.id).await;

    Ok(Json(updated))
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionBody {
    #[serde(alias = "cycle_id")]
    pub cycle_id: i64,
    #[serde(alias = "target_count")]
    #[validate(range(min = 1, max = 1000, message = "targetCount must be 1-1000"))]
    pub target_count: i32,
}

/// POST /api/trainer/sessions
/// Open a session on an active cycle. A cycle that already has an open
/// session returns that session unchanged.
pub async fn create_session(
    Extension(pool): Extension<PgPool>,
    user: AuthUser,
    Json(body): Json<CreateSessionBody>,
) -> Result<Json<Session>, AppError> {
    body.validate()?;
    let cycle = owned_cycle(&pool, user.id, body.cycle_id).await?;
    if cycle.status != CycleStatus::Active {
        return Err(AppError::BadRequest(format!(
            "Cycle {} is {}, sessions need an active cycle",
            cycle.id, cycle.status
        )));
    }

    let session = sessions::open_session(&pool, cycle.id, body.target_count).await?;
    tracing::info!(
        user_id = user.id,
        cycle_id = cycle.id,
        session_id = session.id,
        target = session.target_count,
        "Session opened"
    );
    rebuild_plan(&pool, user.id).await;

    Ok(Json(session))
}

/// PUT /api/trainer/sessions/{session_id}
/// Close a session.
pub async fn close_session(
    Extension(pool): Extension<PgPool>,
    user: AuthUser,
    Path(session_id): Path<i64>,
) -> Result<Json<Session>, AppError> {
    sessions::get_owned_session(&pool, user.id, session_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Session {session_id} not found")))?;

    sessions::close_session(&pool, session_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Session {session_id} not found")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_rank_orders_levels() {
        assert!(difficulty_rank("easy") < difficulty_rank("intermediate"));
        assert!(difficulty_rank("intermediate") < difficulty_rank("advanced"));
        assert_eq!(difficulty_rank("expert"), None);
    }

    #[test]
    fn test_create_set_body_validation() {
        let body: CreateSetBody = serde_json::from_value(serde_json::json!({
            "name": "",
            "difficultyMin": "easy",
            "difficultyMax": "advanced",
            "size": 0
        }))
        .unwrap();
        let errors = body.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("name"));
        assert!(errors.field_errors().contains_key("size"));
    }

    #[test]
    fn test_session_body_accepts_both_casings() {
        let camel: CreateSessionBody =
            serde_json::from_value(serde_json::json!({ "cycleId": 4, "targetCount": 5 })).unwrap();
        let snake: CreateSessionBody =
            serde_json::from_value(serde_json::json!({ "cycle_id": 4, "target_count": 5 })).unwrap();
        assert_eq!((camel.cycle_id, camel.target_count), (4, 5));
        assert_eq!((snake.cycle_id, snake.target_count), (4, 5));

        let zero: CreateSessionBody =
            serde_json::from_value(serde_json::json!({ "cycleId": 4, "targetCount": 0 })).unwrap();
        assert!(zero.validate().unwrap_err().field_errors().contains_key("target_count"));
    }

    #[test]
    fn test_cycle_body_defaults_status() {
        let body: CreateCycleBody =
            serde_json::from_value(serde_json::json!({ "setId": 3, "targetDays": 28 })).unwrap();
        assert_eq!(body.set_id, 3);
        assert!(body.status.is_none());
        assert!(body.validate().is_ok());
    }
}
