use chrono::{DateTime, Utc};
use sqlx::PgPool;
use woodpecker_core::cycle::Session;

use crate::error::AppError;

#[derive(Debug, sqlx::FromRow)]
struct SessionRow {
    id: i64,
    cycle_id: i64,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    target_count: i32,
}

impl From<SessionRow> for Session {
    fn from(row: SessionRow) -> Self {
        Session {
            id: row.id,
            cycle_id: row.cycle_id,
            started_at: Some(row.started_at),
            ended_at: row.ended_at,
            target_count: row.target_count,
        }
    }
}

pub async fn get_open_session(pool: &PgPool, cycle_id: i64) -> Result<Option<Session>, AppError> {
    let row = sqlx::query_as::<_, SessionRow>(
        r#"
        SELECT id, cycle_id, started_at, ended_at, target_count
        FROM sessions
        WHERE cycle_id = $1 AND ended_at IS NULL
        ORDER BY started_at DESC, id DESC
        LIMIT 1
        "#,
    )
    .bind(cycle_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Session::from))
}

/// Open a session unless the cycle already has one. When a concurrent
/// builder won the race, its session is returned instead.
pub async fn open_session(
    pool: &PgPool,
    cycle_id: i64,
    target_count: i32,
) -> Result<Session, AppError> {
    let inserted = sqlx::query_as::<_, SessionRow>(
        r#"
        INSERT INTO sessions (cycle_id, target_count)
        SELECT $1, $2
        WHERE NOT EXISTS (
            SELECT 1 FROM sessions WHERE cycle_id = $1 AND ended_at IS NULL
        )
        RETURNING id, cycle_id, started_at, ended_at, target_count
        "#,
    )
    .bind(cycle_id)
    .bind(target_count)
    .fetch_optional(pool)
    .await?;

    if let Some(row) = inserted {
        return Ok(row.into());
    }

    get_open_session(pool, cycle_id)
        .await?
        .ok_or_else(|| AppError::Internal(format!("No open session for cycle {cycle_id}")))
}

/// Close a session; closing an already closed session keeps its end time.
pub async fn close_session(pool: &PgPool, session_id: i64) -> Result<Option<Session>, AppError> {
    let row = sqlx::query_as::<_, SessionRow>(
        r#"
        UPDATE sessions SET ended_at = COALESCE(ended_at, NOW())
        WHERE id = $1
        RETURNING id, cycle_id, started_at, ended_at, target_count
        "#,
    )
    .bind(session_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Session::from))
}

/// The session, if its cycle's set belongs to `user_id`.
pub async fn get_owned_session(
    pool: &PgPool,
    user_id: i64,
    session_id: i64,
) -> Result<Option<Session>, AppError> {
    let row = sqlx::query_as::<_, SessionRow>(
        r#"
        SELECT ss.id, ss.cycle_id, ss.started_at, ss.ended_at, ss.target_count
        FROM sessions ss
        JOIN cycles c ON c.id = ss.cycle_id
        JOIN sets s ON s.id = c.set_id
        WHERE ss.id = $1 AND s.user_id = $2
        "#,
    )
    .bind(session_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Session::from))
}
