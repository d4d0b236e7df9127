use std::collections::HashSet;

use sqlx::{PgConnection, PgPool};
use woodpecker_core::cycle::Cycle;
use woodpecker_core::progress::AttemptSummary;

use crate::error::AppError;

/// Write a graded attempt into the user's open session of an active cycle
/// whose set holds the puzzle. Returns the attempt ID, or `None` when the
/// puzzle is not part of any running session.
pub async fn record_attempt(
    conn: &mut PgConnection,
    user_id: i64,
    puzzle_id: &str,
    summary: &AttemptSummary,
) -> Result<Option<i64>, AppError> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO attempts (
            session_id, puzzle_id, started_at, ended_at,
            score_first_move, score_ticks, total_points, time_ms,
            correct_first_move, solved
        )
        SELECT ss.id, $2, NOW() - ($7 * INTERVAL '1 millisecond'), NOW(),
               $3, $4, $5, $7, $6, $8
        FROM sessions ss
        JOIN cycles c ON c.id = ss.cycle_id
        JOIN sets s ON s.id = c.set_id
        JOIN set_puzzles sp ON sp.set_id = s.id AND sp.puzzle_id = $2
        WHERE s.user_id = $1
          AND c.status = 'active'
          AND ss.ended_at IS NULL
        ORDER BY ss.started_at DESC, ss.id DESC
        LIMIT 1
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(puzzle_id)
    .bind(summary.score_first_move)
    .bind(summary.score_ticks)
    .bind(summary.total_points)
    .bind(summary.correct_first_move)
    .bind(summary.time_ms)
    .bind(summary.solved)
    .fetch_optional(conn)
    .await?;

    Ok(id)
}

/// Puzzles of the cycle's set that count as solved for this cycle.
///
/// Until a cycle of the set is done, any solved progress counts. After that
/// only progress solved since this cycle started, or a solved attempt in one
/// of its sessions, counts.
pub async fn solved_in_cycle(
    pool: &PgPool,
    user_id: i64,
    cycle: &Cycle,
) -> Result<HashSet<String>, AppError> {
    let ids = sqlx::query_scalar::<_, String>(
        r#"
        SELECT sp.puzzle_id
        FROM set_puzzles sp
        WHERE sp.set_id = $1
          AND (
            EXISTS (
                SELECT 1 FROM progress p
                WHERE p.user_id = $2
                  AND p.puzzle_id = sp.puzzle_id
                  AND p.solved_at IS NOT NULL
                  AND (
                    NOT EXISTS (
                        SELECT 1 FROM cycles d
                        WHERE d.set_id = $1 AND d.status = 'done' AND d.id <> $4
                    )
                    OR ($3::TIMESTAMPTZ IS NOT NULL AND p.solved_at >= $3)
                  )
            )
            OR EXISTS (
                SELECT 1 FROM attempts a
                JOIN sessions ss ON ss.id = a.session_id
                WHERE ss.cycle_id = $4
                  AND a.puzzle_id = sp.puzzle_id
                  AND a.solved
            )
          )
        "#,
    )
    .bind(cycle.set_id)
    .bind(user_id)
    .bind(cycle.started_at)
    .bind(cycle.id)
    .fetch_all(pool)
    .await?;

    Ok(ids.into_iter().collect())
}

/// Puzzles solved by an attempt recorded in this session.
pub async fn solved_in_session(pool: &PgPool, session_id: i64) -> Result<HashSet<String>, AppError> {
    let ids = sqlx::query_scalar::<_, String>(
        "SELECT DISTINCT puzzle_id FROM attempts WHERE session_id = $1 AND solved",
    )
    .bind(session_id)
    .fetch_all(pool)
    .await?;

    Ok(ids.into_iter().collect())
}
