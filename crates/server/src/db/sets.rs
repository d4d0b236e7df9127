use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::db::puzzles::PuzzleSummary;
use crate::error::AppError;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PuzzleSet {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub difficulty_min: String,
    pub difficulty_max: String,
    pub puzzle_count: i64,
    pub created_at: DateTime<Utc>,
}

pub struct NewSet<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub difficulty_min: &'a str,
    pub difficulty_max: &'a str,
}

const SET_COLUMNS: &str = r#"
    s.id, s.name, s.description, s.difficulty_min, s.difficulty_max,
    (SELECT COUNT(*) FROM set_puzzles sp WHERE sp.set_id = s.id) AS puzzle_count,
    s.created_at
"#;

/// Create a set holding `puzzle_ids` at positions 1..n, in one transaction.
pub async fn create_set(
    pool: &PgPool,
    user_id: i64,
    new_set: &NewSet<'_>,
    puzzle_ids: &[String],
) -> Result<PuzzleSet, AppError> {
    let mut tx = pool.begin().await?;

    let set_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO sets (user_id, name, description, difficulty_min, difficulty_max)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(new_set.name)
    .bind(new_set.description)
    .bind(new_set.difficulty_min)
    .bind(new_set.difficulty_max)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO set_puzzles (set_id, puzzle_id, position)
        SELECT $1, ids.puzzle_id, ids.position::INTEGER
        FROM UNNEST($2::TEXT[]) WITH ORDINALITY AS ids(puzzle_id, position)
        "#,
    )
    .bind(set_id)
    .bind(puzzle_ids)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    get_owned_set(pool, user_id, set_id)
        .await?
        .ok_or_else(|| AppError::Internal("Created set disappeared".to_string()))
}

pub async fn list_sets(pool: &PgPool, user_id: i64) -> Result<Vec<PuzzleSet>, AppError> {
    let sets = sqlx::query_as::<_, PuzzleSet>(&format!(
        "SELECT {SET_COLUMNS} FROM sets s WHERE s.user_id = $1 ORDER BY s.id"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(sets)
}

/// The set, if it exists and belongs to `user_id`.
pub async fn get_owned_set(
    pool: &PgPool,
    user_id: i64,
    set_id: i64,
) -> Result<Option<PuzzleSet>, AppError> {
    let set = sqlx::query_as::<_, PuzzleSet>(&format!(
        "SELECT {SET_COLUMNS} FROM sets s WHERE s.id = $1 AND s.user_id = $2"
    ))
    .bind(set_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(set)
}

/// Set IDs owned by the user, ascending.
pub async fn set_ids_for_user(pool: &PgPool, user_id: i64) -> Result<Vec<i64>, AppError> {
    let ids = sqlx::query_scalar::<_, i64>("SELECT id FROM sets WHERE user_id = $1 ORDER BY id")
        .bind(user_id)
        .fetch_all(pool)
        .await?;

    Ok(ids)
}

/// Puzzle IDs of a set in stored position order.
pub async fn puzzle_ids(pool: &PgPool, set_id: i64) -> Result<Vec<String>, AppError> {
    let ids = sqlx::query_scalar::<_, String>(
        "SELECT puzzle_id FROM set_puzzles WHERE set_id = $1 ORDER BY position, puzzle_id",
    )
    .bind(set_id)
    .fetch_all(pool)
    .await?;

    Ok(ids)
}

pub async fn puzzles_in_set(pool: &PgPool, set_id: i64) -> Result<Vec<PuzzleSummary>, AppError> {
    let puzzles = sqlx::query_as::<_, PuzzleSummary>(
        r#"
        SELECT p.id, p.fen, p.side_to_move, p.difficulty
        FROM set_puzzles sp
        JOIN puzzles p ON p.id = sp.puzzle_id
        WHERE sp.set_id = $1
        ORDER BY sp.position, sp.puzzle_id
        "#,
    )
    .bind(set_id)
    .fetch_all(pool)
    .await?;

    Ok(puzzles)
}

/// Users the daily sweep visits: owners of sets with a live cycle, plus
/// users whose plan is still active.
pub async fn users_to_sweep(pool: &PgPool) -> Result<Vec<i64>, AppError> {
    let ids = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT s.user_id
        FROM sets s
        JOIN cycles c ON c.set_id = s.id
        WHERE c.status IN ('active', 'planned')
        UNION
        SELECT user_id FROM daily_plans WHERE active
        ORDER BY 1
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(ids)
}
