use serde::Serialize;
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use woodpecker_core::puzzle::{side_to_move, Puzzle};
use woodpecker_core::{CoreError, Solution};

use crate::error::AppError;

#[derive(Debug, sqlx::FromRow)]
struct PuzzleRow {
    id: String,
    difficulty: String,
    fen: String,
    solution: JsonValue,
    ticks: JsonValue,
    solution_text: Option<String>,
}

impl PuzzleRow {
    fn into_puzzle(self) -> Result<Puzzle, CoreError> {
        Ok(Puzzle {
            solution: Solution::from_value(self.solution)?,
            ticks: serde_json::from_value(self.ticks)?,
            id: self.id,
            difficulty: self.difficulty,
            fen: self.fen,
            solution_text: self.solution_text,
        })
    }
}

/// What the client needs to show a puzzle (no solution).
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PuzzleSummary {
    pub id: String,
    pub fen: String,
    pub side_to_move: String,
    pub difficulty: String,
}

/// Load a puzzle with its parsed solution. A stored solution that does not
/// fit the tree model fails only this lookup.
pub async fn get_puzzle(pool: &PgPool, id: &str) -> Result<Option<Puzzle>, AppError> {
    let row = sqlx::query_as::<_, PuzzleRow>(
        "SELECT id, difficulty, fen, solution, ticks, solution_text FROM puzzles WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(Some(row.into_puzzle()?)),
        None => Ok(None),
    }
}

/// The puzzle's written solution; `None` when the puzzle is unknown or has none.
pub async fn get_solution_text(pool: &PgPool, id: &str) -> Result<Option<String>, AppError> {
    let text = sqlx::query_scalar::<_, Option<String>>(
        "SELECT solution_text FROM puzzles WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(text.flatten().filter(|t| !t.trim().is_empty()))
}

pub async fn get_summary(
    pool: &PgPool,
    id: &str,
    difficulty: Option<&str>,
) -> Result<Option<PuzzleSummary>, AppError> {
    let summary = sqlx::query_as::<_, PuzzleSummary>(
        r#"SELECT id, fen, side_to_move, difficulty
           FROM puzzles
           WHERE id = $1 AND ($2::TEXT IS NULL OR difficulty = $2)"#,
    )
    .bind(id)
    .bind(difficulty)
    .fetch_optional(pool)
    .await?;

    Ok(summary)
}

/// First puzzle of a difficulty by ID; the fallback when nothing is due.
pub async fn first_by_difficulty(
    pool: &PgPool,
    difficulty: &str,
) -> Result<Option<PuzzleSummary>, AppError> {
    let summary = sqlx::query_as::<_, PuzzleSummary>(
        r#"SELECT id, fen, side_to_move, difficulty
           FROM puzzles
           WHERE difficulty = $1
           ORDER BY id
           LIMIT 1"#,
    )
    .bind(difficulty)
    .fetch_optional(pool)
    .await?;

    Ok(summary)
}

/// Up to `limit` puzzle IDs whose difficulty lies in `[min, max]`
/// (easy < intermediate < advanced), ordered by ID.
pub async fn ids_in_difficulty_range(
    pool: &PgPool,
    min: &str,
    max: &str,
    limit: i64,
) -> Result<Vec<String>, AppError> {
    let ids = sqlx::query_scalar::<_, String>(
        r#"
        SELECT id FROM puzzles
        WHERE array_position(ARRAY['easy', 'intermediate', 'advanced'], difficulty)
              BETWEEN array_position(ARRAY['easy', 'intermediate', 'advanced'], $1)
                  AND array_position(ARRAY['easy', 'intermediate', 'advanced'], $2)
        ORDER BY id
        LIMIT $3
        "#,
    )
    .bind(min)
    .bind(max)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(ids)
}

/// Insert or replace a batch of puzzles in one transaction.
pub async fn upsert_puzzles(pool: &PgPool, puzzles: &[Puzzle]) -> Result<usize, AppError> {
    let mut tx = pool.begin().await?;

    for puzzle in puzzles {
        let side = side_to_move(&puzzle.fen)?;
        let solution = serde_json::to_value(&puzzle.solution)
            .map_err(|e| AppError::Internal(format!("Solution encode error: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO puzzles (id, difficulty, fen, side_to_move, solution, ticks, solution_text)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                difficulty = EXCLUDED.difficulty,
                fen = EXCLUDED.fen,
                side_to_move = EXCLUDED.side_to_move,
                solution = EXCLUDED.solution,
                ticks = EXCLUDED.ticks,
                solution_text = EXCLUDED.solution_text
            "#,
        )
        .bind(&puzzle.id)
        .bind(&puzzle.difficulty)
        .bind(&puzzle.fen)
        .bind(side)
        .bind(&solution)
        .bind(serde_json::json!(puzzle.ticks))
        .bind(&puzzle.solution_text)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(puzzles.len())
}
