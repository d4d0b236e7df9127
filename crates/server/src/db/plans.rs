use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use woodpecker_core::plan::DailyPlan;

use crate::error::AppError;

#[derive(Debug, sqlx::FromRow)]
struct PlanRow {
    user_id: i64,
    active: bool,
    today_batch: Json<Vec<String>>,
    per_day: i32,
    generated_at: DateTime<Utc>,
}

impl From<PlanRow> for DailyPlan {
    fn from(row: PlanRow) -> Self {
        DailyPlan {
            user_id: row.user_id,
            active: row.active,
            today_batch: row.today_batch.0,
            per_day: row.per_day,
            generated_at: row.generated_at,
        }
    }
}

pub async fn get_plan(pool: &PgPool, user_id: i64) -> Result<Option<DailyPlan>, AppError> {
    let row = sqlx::query_as::<_, PlanRow>(
        r#"SELECT user_id, active, today_batch, per_day, generated_at
           FROM daily_plans WHERE user_id = $1"#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(DailyPlan::from))
}

/// Insert or replace the user's single plan row.
pub async fn upsert_plan(
    pool: &PgPool,
    user_id: i64,
    today_batch: &[String],
    per_day: i32,
    active: bool,
) -> Result<DailyPlan, AppError> {
    let row = sqlx::query_as::<_, PlanRow>(
        r#"
        INSERT INTO daily_plans (user_id, today_batch, per_day, active, generated_at)
        VALUES ($1, $2, $3, $4, NOW())
        ON CONFLICT (user_id) DO UPDATE SET
            today_batch = EXCLUDED.today_batch,
            per_day = EXCLUDED.per_day,
            active = EXCLUDED.active,
            generated_at = EXCLUDED.generated_at,
            updated_at = NOW()
        RETURNING user_id, active, today_batch, per_day, generated_at
        "#,
    )
    .bind(user_id)
    .bind(Json(today_batch))
    .bind(per_day)
    .bind(active)
    .fetch_one(pool)
    .await?;

    Ok(row.into())
}
