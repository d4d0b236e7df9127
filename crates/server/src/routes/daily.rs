use axum::{Extension, Json};
use chrono::Local;
use sqlx::PgPool;
use woodpecker_core::plan::{start_of_day, DailyStatus};

use crate::auth::middleware::AuthUser;
use crate::db::progress;
use crate::error::AppError;
use crate::scheduler;

/// GET /api/daily
/// Today's batch and how much of it is done; builds the plan on first access of the day.
pub async fn get_daily(
    Extension(pool): Extension<PgPool>,
    user: AuthUser,
) -> Result<Json<DailyStatus>, AppError> {
    let plan = scheduler::ensure_today_plan(&pool, user.id).await?;
    let attempted = progress::attempted_since(&pool, user.id, start_of_day(&Local::now())).await?;

    Ok(Json(DailyStatus::from_plan(&plan, &attempted)))
}
