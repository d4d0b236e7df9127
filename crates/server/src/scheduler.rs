//! Daily plan scheduler.
//!
//! One idempotent build routine per user, called from two places: the
//! once-a-day sweep and the lazy rebuild on first access of the day. Racing
//! builders are settled by the database (conditional session insert, plan
//! upsert on `daily_plans.user_id`), never by in-process locks.

use std::collections::HashSet;

use anyhow::Context;
use chrono::{DateTime, Local, NaiveTime, Utc};
use futures::{stream, StreamExt};
use sqlx::PgPool;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use woodpecker_core::cycle::{Cycle, CycleStatus, Session};
use woodpecker_core::plan::{
    assess_cycle, days_left, is_from_earlier_day, next_run_after, open_slots, pick_cycle,
    select_batch, session_target, CyclePick, CycleProgress, DailyPlan,
};

use crate::db::{attempts, cycles, plans, sessions, sets};
use crate::error::AppError;

/// Today's contribution of one set.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SetBatch {
    puzzles: Vec<String>,
    target: i32,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub users: usize,
    pub rebuilt: usize,
    pub failed: usize,
}

/// The user's plan for today, rebuilt first when missing or stale.
pub async fn ensure_today_plan(pool: &PgPool, user_id: i64) -> Result<DailyPlan, AppError> {
    let now = Local::now();

    if let Some(plan) = plans::get_plan(pool, user_id).await? {
        if !is_from_earlier_day(plan.generated_at, &now) {
            return Ok(plan);
        }
    }

    Ok(build_plan_for_user(pool, user_id, &now).await?)
}

/// Build and persist today's plan for one user across all their sets.
pub async fn build_plan_for_user(
    pool: &PgPool,
    user_id: i64,
    now: &DateTime<Local>,
) -> anyhow::Result<DailyPlan> {
    let set_ids = sets::set_ids_for_user(pool, user_id).await?;

    let mut batches = Vec::with_capacity(set_ids.len());
    for set_id in set_ids {
        let batch = schedule_set(pool, user_id, set_id, now)
            .await
            .with_context(|| format!("scheduling set {set_id}"))?;
        batches.extend(batch);
    }

    let (today_batch, per_day) = merge_batches(batches);
    let plan = plans::upsert_plan(pool, user_id, &today_batch, per_day, per_day > 0).await?;
    Ok(plan)
}

/// Concatenate per-set batches in order, dropping puzzles already taken by
/// an earlier set.
fn merge_batches(batches: Vec<SetBatch>) -> (Vec<String>, i32) {
    let mut seen = HashSet::new();
    let mut today_batch = Vec::new();
    let mut per_day = 0;

    for batch in batches {
        per_day += batch.target;
        for id in batch.puzzles {
            if seen.insert(id.clone()) {
                today_batch.push(id);
            }
        }
    }

    (today_batch, per_day)
}

async fn schedule_set(
    pool: &PgPool,
    user_id: i64,
    set_id: i64,
    now: &DateTime<Local>,
) -> anyhow::Result<Option<SetBatch>> {
    let set_puzzles = sets::puzzle_ids(pool, set_id).await?;

    // A completed cycle hands over to the next planned one within the same pass.
    for _ in 0..2 {
        let Some(cycle) = working_cycle(pool, set_id).await? else {
            return Ok(None);
        };

        let solved = attempts::solved_in_cycle(pool, user_id, &cycle).await?;
        match assess_cycle(&set_puzzles, &solved) {
            CycleProgress::Empty => return Ok(None),
            CycleProgress::Complete => {
                if cycles::transition(pool, cycle.id, CycleStatus::Active, CycleStatus::Done)
                    .await?
                    .is_some()
                {
                    info!(user_id, set_id, cycle_id = cycle.id, "Cycle complete");
                }
            }
            CycleProgress::Working { remaining } => {
                let session = current_session(pool, &cycle, remaining, now).await?;
                // Puzzles solved earlier in a reused session use up its slots.
                let done = attempts::solved_in_session(pool, session.id).await?;
                let slots = open_slots(session.target_count, done.len());
                let puzzles = select_batch(&set_puzzles, &solved, slots);
                return Ok(Some(SetBatch {
                    puzzles,
                    target: session.target_count,
                }));
            }
        }
    }

    Ok(None)
}

/// The set's active cycle after settling duplicates and promotions.
async fn working_cycle(pool: &PgPool, set_id: i64) -> anyhow::Result<Option<Cycle>> {
    let all = cycles::list_for_set(pool, set_id).await?;

    match pick_cycle(&all) {
        CyclePick::Active { cycle, demote } => {
            if !demote.is_empty() {
                warn!(set_id, kept = cycle.id, demoted = ?demote, "Multiple active cycles");
                cycles::demote(pool, &demote).await?;
            }
            Ok(Some(cycle))
        }
        CyclePick::Promote(next) => {
            match cycles::transition(pool, next.id, CycleStatus::Planned, CycleStatus::Active).await? {
                Some(cycle) => {
                    info!(set_id, cycle_id = cycle.id, index = cycle.index, "Cycle started");
                    Ok(Some(cycle))
                }
                // Another builder got there first.
                None => Ok(cycles::get_active(pool, set_id).await?),
            }
        }
        CyclePick::Resting | CyclePick::Idle => Ok(None),
    }
}

/// Today's open session of the cycle. Sessions are daily: one left open
/// from an earlier day is closed and replaced.
async fn current_session(
    pool: &PgPool,
    cycle: &Cycle,
    remaining: usize,
    now: &DateTime<Local>,
) -> anyhow::Result<Session> {
    if let Some(open) = sessions::get_open_session(pool, cycle.id).await? {
        let stale = open
            .started_at
            .map(|started| is_from_earlier_day(started, now))
            .unwrap_or(true);
        if !stale {
            return Ok(open);
        }
        sessions::close_session(pool, open.id).await?;
    }

    let target = session_target(remaining, days_left(cycle, now.with_timezone(&Utc)));
    Ok(sessions::open_session(pool, cycle.id, target).await?)
}

/// Rebuild plans for every schedulable user, `concurrency` users at a time.
/// A failing user is logged and skipped.
pub async fn run_sweep(pool: &PgPool, concurrency: usize) -> Result<SweepReport, AppError> {
    let users = sets::users_to_sweep(pool).await?;
    let now = Local::now();

    let outcomes: Vec<bool> = stream::iter(users.iter().copied())
        .map(|user_id| async move {
            match build_plan_for_user(pool, user_id, &now).await {
                Ok(plan) => {
                    info!(
                        user_id,
                        batch = plan.today_batch.len(),
                        per_day = plan.per_day,
                        "Daily plan rebuilt"
                    );
                    true
                }
                Err(e) => {
                    let chain = format!("{e:#}");
                    error!(user_id, error = %chain, "Daily plan rebuild failed");
                    false
                }
            }
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let rebuilt = outcomes.iter().filter(|ok| **ok).count();
    Ok(SweepReport {
        users: users.len(),
        rebuilt,
        failed: outcomes.len() - rebuilt,
    })
}

/// Background task running the sweep every day at local time `at`.
pub fn spawn_daily(pool: PgPool, at: NaiveTime, concurrency: usize) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let now = Local::now();
            let next = next_run_after(&now, at);
            info!(next_run = %next, "Daily plan sweep scheduled");

            let wait = (next - now)
                .to_std()
                .unwrap_or(std::time::Duration::from_secs(60));
            tokio::time::sleep(wait).await;

            match run_sweep(&pool, concurrency).await {
                Ok(report) => info!(
                    users = report.users,
                    rebuilt = report.rebuilt,
                    failed = report.failed,
                    "Daily plan sweep finished"
                ),
                Err(e) => error!(error = %e, "Daily plan sweep failed"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(ids: &[&str], target: i32) -> SetBatch {
        SetBatch {
            puzzles: ids.iter().map(|s| s.to_string()).collect(),
            target,
        }
    }

    #[test]
    fn test_merge_keeps_set_order() {
        let (today, per_day) = merge_batches(vec![batch(&["p1", "p2"], 2), batch(&["p9"], 3)]);
        assert_eq!(today, vec!["p1", "p2", "p9"]);
        assert_eq!(per_day, 5);
    }

    #[test]
    fn test_merge_drops_puzzles_shared_between_sets() {
        let (today, per_day) = merge_batches(vec![batch(&["p1", "p2"], 2), batch(&["p2", "p3"], 2)]);
        assert_eq!(today, vec!["p1", "p2", "p3"]);
        assert_eq!(per_day, 4);
    }

    #[test]
    fn test_merge_empty() {
        let (today, per_day) = merge_batches(Vec::new());
        assert!(today.is_empty());
        assert_eq!(per_day, 0);
    }
}
