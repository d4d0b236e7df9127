use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use woodpecker_core::progress::{Progress, ProgressUpdate};

use crate::error::AppError;

#[derive(Debug, sqlx::FromRow)]
struct ProgressRow {
    puzzle_id: String,
    attempts: i32,
    score: i32,
    solved_at: Option<DateTime<Utc>>,
    last_typed: Json<Vec<String>>,
    updated_at: DateTime<Utc>,
}

impl From<ProgressRow> for Progress {
    fn from(row: ProgressRow) -> Self {
        Progress {
            puzzle_id: row.puzzle_id,
            attempts: row.attempts,
            score: row.score,
            solved_at: row.solved_at,
            last_typed: row.last_typed.0,
            updated_at: row.updated_at,
        }
    }
}

/// Fold one attempt into the user's progress row in a single statement.
///
/// First attempt inserts `attempts = 1`. Later attempts increment `attempts`
/// and overwrite `score` and `last_typed`. `solved_at` is set the first time
/// the attempt reaches the solved threshold and is never changed afterwards.
pub async fn record(
    conn: &mut PgConnection,
    user_id: i64,
    puzzle_id: &str,
    update: &ProgressUpdate,
) -> Result<Progress, AppError> {
    let row = sqlx::query_as::<_, ProgressRow>(
        r#"
        INSERT INTO progress (user_id, puzzle_id, attempts, score, last_typed, solved_at)
        VALUES ($1, $2, 1, $3, $4, CASE WHEN $5 THEN NOW() ELSE NULL END)
        ON CONFLICT (user_id, puzzle_id) DO UPDATE SET
            attempts = progress.attempts + 1,
            score = EXCLUDED.score,
            last_typed = EXCLUDED.last_typed,
            solved_at = COALESCE(progress.solved_at, EXCLUDED.solved_at),
            updated_at = NOW()
        RETURNING puzzle_id, attempts, score, solved_at, last_typed, updated_at
        "#,
    )
    .bind(user_id)
    .bind(puzzle_id)
    .bind(update.score)
    .bind(Json(&update.typed))
    .bind(update.reaches_solved_threshold())
    .fetch_one(conn)
    .await?;

    Ok(row.into())
}

pub async fn get_progress(
    pool: &PgPool,
    user_id: i64,
    puzzle_id: &str,
) -> Result<Option<Progress>, AppError> {
    let row = sqlx::query_as::<_, ProgressRow>(
        r#"SELECT puzzle_id, attempts, score, solved_at, last_typed, updated_at
           FROM progress WHERE user_id = $1 AND puzzle_id = $2"#,
    )
    .bind(user_id)
    .bind(puzzle_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Progress::from))
}

/// Puzzle IDs the user has attempted since `since`.
pub async fn attempted_since(
    pool: &PgPool,
    user_id: i64,
    since: DateTime<Utc>,
) -> Result<HashSet<String>, AppError> {
    let ids = sqlx::query_scalar::<_, String>(
        "SELECT puzzle_id FROM progress WHERE user_id = $1 AND updated_at >= $2",
    )
    .bind(user_id)
    .bind(since)
    .fetch_all(pool)
    .await?;

    Ok(ids.into_iter().collect())
}

pub struct ProgressTotals {
    pub total_attempted: i64,
    pub total_solved: i64,
    pub average_score: f64,
}

pub async fn totals(pool: &PgPool, user_id: i64) -> Result<ProgressTotals, AppError> {
    let (total_attempted, total_solved, average_score): (i64, i64, f64) = sqlx::query_as(
        r#"
        SELECT COUNT(*),
               COUNT(*) FILTER (WHERE solved_at IS NOT NULL),
               COALESCE(AVG(score), 0)::DOUBLE PRECISION
        FROM progress
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(ProgressTotals {
        total_attempted,
        total_solved,
        average_score,
    })
}
