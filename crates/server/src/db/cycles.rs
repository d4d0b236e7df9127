use chrono::{DateTime, Utc};
use sqlx::PgPool;
use woodpecker_core::cycle::{Cycle, CycleStatus};
use woodpecker_core::CoreError;

use crate::error::AppError;

#[derive(Debug, sqlx::FromRow)]
struct CycleRow {
    id: i64,
    set_id: i64,
    cycle_index: i32,
    target_days: i32,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    status: String,
}

impl TryFrom<CycleRow> for Cycle {
    type Error = CoreError;

    fn try_from(row: CycleRow) -> Result<Self, Self::Error> {
        Ok(Cycle {
            id: row.id,
            set_id: row.set_id,
            index: row.cycle_index,
            target_days: row.target_days,
            started_at: row.started_at,
            ended_at: row.ended_at,
            status: row.status.parse()?,
        })
    }
}

const CYCLE_COLUMNS: &str = "id, set_id, cycle_index, target_days, started_at, ended_at, status";

fn into_cycle(row: Option<CycleRow>) -> Result<Option<Cycle>, AppError> {
    Ok(row.map(Cycle::try_from).transpose()?)
}

/// All cycles of a set, by index.
pub async fn list_for_set(pool: &PgPool, set_id: i64) -> Result<Vec<Cycle>, AppError> {
    let rows = sqlx::query_as::<_, CycleRow>(&format!(
        "SELECT {CYCLE_COLUMNS} FROM cycles WHERE set_id = $1 ORDER BY cycle_index, id"
    ))
    .bind(set_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| Cycle::try_from(row).map_err(AppError::from))
        .collect()
}

/// The lowest-index active cycle of a set.
pub async fn get_active(pool: &PgPool, set_id: i64) -> Result<Option<Cycle>, AppError> {
    let row = sqlx::query_as::<_, CycleRow>(&format!(
        r#"SELECT {CYCLE_COLUMNS} FROM cycles
           WHERE set_id = $1 AND status = 'active'
           ORDER BY cycle_index, id
           LIMIT 1"#
    ))
    .bind(set_id)
    .fetch_optional(pool)
    .await?;

    into_cycle(row)
}

/// The cycle, if its set belongs to `user_id`.
pub async fn get_owned_cycle(
    pool: &PgPool,
    user_id: i64,
    cycle_id: i64,
) -> Result<Option<Cycle>, AppError> {
    let row = sqlx::query_as::<_, CycleRow>(
        r#"
        SELECT c.id, c.set_id, c.cycle_index, c.target_days, c.started_at, c.ended_at, c.status
        FROM cycles c
        JOIN sets s ON s.id = c.set_id
        WHERE c.id = $1 AND s.user_id = $2
        "#,
    )
    .bind(cycle_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    into_cycle(row)
}

/// Append a cycle to a set. Returns `None` when `status` is active and the
/// set already has an active cycle.
pub async fn create_cycle(
    pool: &PgPool,
    set_id: i64,
    target_days: i32,
    status: CycleStatus,
) -> Result<Option<Cycle>, AppError> {
    let row = sqlx::query_as::<_, CycleRow>(&format!(
        r#"
        INSERT INTO cycles (set_id, cycle_index, target_days, status, started_at)
        SELECT $1,
               COALESCE((SELECT MAX(cycle_index) FROM cycles WHERE set_id = $1), 0) + 1,
               $2,
               $3,
               CASE WHEN $3 = 'active' THEN NOW() ELSE NULL END
        WHERE NOT ($3 = 'active' AND EXISTS (
            SELECT 1 FROM cycles WHERE set_id = $1 AND status = 'active'
        ))
        RETURNING {CYCLE_COLUMNS}
        "#
    ))
    .bind(set_id)
    .bind(target_days)
    .bind(status.as_str())
    .fetch_optional(pool)
    .await?;

    into_cycle(row)
}

/// Move a cycle from `from` to `to`. Activation stamps `started_at` the first
/// time and is refused while another cycle of the set is active; `done`
/// stamps `ended_at` and closes the cycle's open session. Returns `None` when
/// the cycle was no longer in `from` or the activation was refused.
pub async fn transition(
    pool: &PgPool,
    cycle_id: i64,
    from: CycleStatus,
    to: CycleStatus,
) -> Result<Option<Cycle>, AppError> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query_as::<_, CycleRow>(&format!(
        r#"
        UPDATE cycles SET
            status = $3,
            started_at = CASE WHEN $3 = 'active' THEN COALESCE(started_at, NOW()) ELSE started_at END,
            ended_at = CASE WHEN $3 = 'done' THEN NOW() ELSE ended_at END
        WHERE id = $1
          AND status = $2
          AND NOT ($3 = 'active' AND EXISTS (
              SELECT 1 FROM cycles other
              WHERE other.set_id = cycles.set_id
                AND other.status = 'active'
                AND other.id <> cycles.id
          ))
        RETURNING {CYCLE_COLUMNS}
        "#
    ))
    .bind(cycle_id)
    .bind(from.as_str())
    .bind(to.as_str())
    .fetch_optional(&mut *tx)
    .await?;

    if row.is_some() && to == CycleStatus::Done {
        sqlx::query("UPDATE sessions SET ended_at = NOW() WHERE cycle_id = $1 AND ended_at IS NULL")
            .bind(cycle_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    into_cycle(row)
}

/// Return surplus active cycles to planned.
pub async fn demote(pool: &PgPool, cycle_ids: &[i64]) -> Result<u64, AppError> {
    if cycle_ids.is_empty() {
        return Ok(0);
    }

    let result = sqlx::query(
        "UPDATE cycles SET status = 'planned' WHERE id = ANY($1) AND status = 'active'",
    )
    .bind(cycle_ids)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
