//! Daily plan arithmetic.
//!
//! Everything here is pure: the server's scheduler loads cycles, sessions and
//! solved sets, asks these functions what to do, and persists the answer.

use std::collections::HashSet;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::cycle::{Cycle, CycleStatus};

/// The persisted plan for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyPlan {
    pub user_id: i64,
    pub active: bool,
    pub today_batch: Vec<String>,
    pub per_day: i32,
    pub generated_at: DateTime<Utc>,
}

/// What the daily-status operation reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStatus {
    pub has_active_cycle: bool,
    pub done_today: usize,
    pub per_day: i32,
    pub remaining: usize,
    pub today_batch: Vec<String>,
    pub generated_at: Option<DateTime<Utc>>,
}

impl DailyStatus {
    /// `attempted_today` holds puzzle IDs with progress written since local midnight.
    pub fn from_plan(plan: &DailyPlan, attempted_today: &HashSet<String>) -> Self {
        let done_today = plan
            .today_batch
            .iter()
            .filter(|id| attempted_today.contains(*id))
            .count();

        Self {
            has_active_cycle: plan.per_day > 0,
            done_today,
            per_day: plan.per_day,
            remaining: plan.today_batch.len().saturating_sub(done_today),
            today_batch: plan.today_batch.clone(),
            generated_at: Some(plan.generated_at),
        }
    }
}

/// First puzzle of the batch not yet attempted today.
pub fn next_due<'a>(plan: &'a DailyPlan, attempted_today: &HashSet<String>) -> Option<&'a str> {
    plan.today_batch
        .iter()
        .find(|id| !attempted_today.contains(*id))
        .map(String::as_str)
}

/// Which cycle of a set the scheduler should work with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CyclePick {
    /// An active cycle; `demote` lists surplus active cycles to move back to planned.
    Active { cycle: Cycle, demote: Vec<i64> },
    /// No active cycle; this planned cycle should be activated.
    Promote(Cycle),
    /// A cycle is resting, the set is paused.
    Resting,
    /// Nothing left to schedule.
    Idle,
}

/// Choose the working cycle among all cycles of one set.
pub fn pick_cycle(cycles: &[Cycle]) -> CyclePick {
    let mut active: Vec<&Cycle> = cycles
        .iter()
        .filter(|c| c.status == CycleStatus::Active)
        .collect();
    active.sort_by_key(|c| (c.index, c.id));

    if let Some((keep, surplus)) = active.split_first() {
        return CyclePick::Active {
            cycle: (*keep).clone(),
            demote: surplus.iter().map(|c| c.id).collect(),
        };
    }

    if cycles.iter().any(|c| c.status == CycleStatus::Rest) {
        return CyclePick::Resting;
    }

    cycles
        .iter()
        .filter(|c| c.status == CycleStatus::Planned)
        .min_by_key(|c| (c.index, c.id))
        .map(|c| CyclePick::Promote(c.clone()))
        .unwrap_or(CyclePick::Idle)
}

/// Where an active cycle stands against its set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleProgress {
    /// The set has no puzzles.
    Empty,
    /// Every puzzle is solved for this cycle.
    Complete,
    Working { remaining: usize },
}

pub fn assess_cycle(set_puzzles: &[String], solved: &HashSet<String>) -> CycleProgress {
    if set_puzzles.is_empty() {
        return CycleProgress::Empty;
    }

    let remaining = unsolved(set_puzzles, solved).count();
    if remaining == 0 {
        CycleProgress::Complete
    } else {
        CycleProgress::Working { remaining }
    }
}

fn unsolved<'a>(
    set_puzzles: &'a [String],
    solved: &'a HashSet<String>,
) -> impl Iterator<Item = &'a String> + 'a {
    let mut seen: HashSet<&'a str> = HashSet::new();
    set_puzzles
        .iter()
        .filter(move |&id| !solved.contains(id) && seen.insert(id.as_str()))
}

/// Whole days elapsed since `started_at` (never negative).
pub fn days_elapsed(started_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - started_at).num_days().max(0)
}

/// Days left in the cycle's target window, counting today; at least 1.
pub fn days_left(cycle: &Cycle, now: DateTime<Utc>) -> i64 {
    let elapsed = cycle
        .started_at
        .map(|started| days_elapsed(started, now))
        .unwrap_or(0);
    (i64::from(cycle.target_days) - elapsed).max(1)
}

/// Puzzles per session: remaining spread over the days left, rounded up, at least 1.
pub fn session_target(remaining: usize, days_left: i64) -> i32 {
    let days = days_left.max(1) as usize;
    remaining.div_ceil(days).max(1) as i32
}

/// Today's batch for one set: unsolved puzzles in position order, no duplicates,
/// at most `target` of them.
pub fn select_batch(set_puzzles: &[String], solved: &HashSet<String>, target: i32) -> Vec<String> {
    unsolved(set_puzzles, solved)
        .take(target.max(0) as usize)
        .cloned()
        .collect()
}

/// Batch slots still open in a session once the puzzles already solved in it
/// are taken off its target.
pub fn open_slots(target: i32, solved_in_session: usize) -> i32 {
    let done = i32::try_from(solved_in_session).unwrap_or(i32::MAX);
    target.saturating_sub(done).max(0)
}

/// Resolve a local wall-clock time, stepping past DST gaps.
fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(naive + Duration::hours(1))).earliest())
        .unwrap_or_else(|| tz.from_utc_datetime(&naive))
}

fn local_date<Tz: TimeZone>(now: &DateTime<Tz>) -> NaiveDate {
    now.date_naive()
}

/// Local midnight of `now`'s day, as UTC.
pub fn start_of_day<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Utc> {
    resolve_local(&now.timezone(), local_date(now).and_time(NaiveTime::default())).with_timezone(&Utc)
}

/// A plan (or session) generated before today's local midnight belongs to an earlier day.
pub fn is_from_earlier_day<Tz: TimeZone>(generated_at: DateTime<Utc>, now: &DateTime<Tz>) -> bool {
    generated_at < start_of_day(now)
}

/// Next instant strictly after `now` whose local time is `at`.
pub fn next_run_after<Tz: TimeZone>(now: &DateTime<Tz>, at: NaiveTime) -> DateTime<Tz> {
    let tz = now.timezone();
    let today = local_date(now);

    let candidate = resolve_local(&tz, today.and_time(at));
    if candidate > *now {
        return candidate;
    }
    resolve_local(&tz, (today + Duration::days(1)).and_time(at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn ids(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn set_of(raw: &[&str]) -> HashSet<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn cycle(id: i64, index: i32, status: CycleStatus) -> Cycle {
        Cycle {
            id,
            set_id: 1,
            index,
            target_days: 28,
            started_at: None,
            ended_at: None,
            status,
        }
    }

    fn utc(raw: &str) -> DateTime<Utc> {
        raw.parse().unwrap()
    }

    #[test]
    fn test_session_target_ceiling_and_minimum() {
        assert_eq!(session_target(10, 3), 4);
        assert_eq!(session_target(9, 3), 3);
        assert_eq!(session_target(222, 28), 8);
        assert_eq!(session_target(0, 5), 1);
        assert_eq!(session_target(5, 0), 5);
        assert_eq!(session_target(5, -2), 5);
    }

    #[test]
    fn test_days_left() {
        let mut c = cycle(1, 1, CycleStatus::Active);
        c.target_days = 7;
        c.started_at = Some(utc("2026-03-01T08:00:00Z"));

        assert_eq!(days_left(&c, utc("2026-03-01T20:00:00Z")), 7);
        assert_eq!(days_left(&c, utc("2026-03-03T09:00:00Z")), 5);
        assert_eq!(days_left(&c, utc("2026-03-20T09:00:00Z")), 1);

        c.started_at = None;
        assert_eq!(days_left(&c, utc("2026-03-20T09:00:00Z")), 7);
    }

    #[test]
    fn test_select_batch_skips_solved_and_truncates() {
        let puzzles = ids(&["p1", "p2", "p3", "p4", "p5"]);
        let solved = set_of(&["p2", "p4"]);

        assert_eq!(select_batch(&puzzles, &solved, 2), ids(&["p1", "p3"]));
        assert_eq!(select_batch(&puzzles, &solved, 10), ids(&["p1", "p3", "p5"]));
        assert!(select_batch(&puzzles, &solved, 0).is_empty());
    }

    #[test]
    fn test_select_batch_never_duplicates() {
        let puzzles = ids(&["p1", "p1", "p2"]);
        assert_eq!(select_batch(&puzzles, &HashSet::new(), 5), ids(&["p1", "p2"]));
    }

    #[test]
    fn test_batch_bounds_hold_for_all_targets() {
        let puzzles: Vec<String> = (1..=12).map(|i| format!("p{i}")).collect();
        let solved = set_of(&["p3", "p7", "p8"]);
        for target in 0..15 {
            let batch = select_batch(&puzzles, &solved, target);
            assert!(batch.len() <= target as usize);
            assert!(batch.iter().all(|id| !solved.contains(id)));
        }
    }

    #[test]
    fn test_open_slots_shrink_with_session_solves() {
        assert_eq!(open_slots(3, 0), 3);
        assert_eq!(open_slots(3, 2), 1);
        assert_eq!(open_slots(3, 5), 0);

        // A rebuild mid-session: the two puzzles solved today leave one slot.
        let puzzles = ids(&["p1", "p2", "p3", "p4", "p5"]);
        let solved = set_of(&["p1", "p2"]);
        let batch = select_batch(&puzzles, &solved, open_slots(3, 2));
        assert_eq!(batch, ids(&["p3"]));
    }

    #[test]
    fn test_assess_cycle() {
        let puzzles = ids(&["p1", "p2"]);
        assert_eq!(assess_cycle(&[], &HashSet::new()), CycleProgress::Empty);
        assert_eq!(
            assess_cycle(&puzzles, &set_of(&["p1"])),
            CycleProgress::Working { remaining: 1 }
        );
        assert_eq!(assess_cycle(&puzzles, &set_of(&["p1", "p2"])), CycleProgress::Complete);
    }

    #[test]
    fn test_pick_cycle_prefers_lowest_active_and_demotes_rest() {
        let cycles = vec![
            cycle(10, 2, CycleStatus::Active),
            cycle(11, 1, CycleStatus::Active),
            cycle(12, 3, CycleStatus::Planned),
        ];
        match pick_cycle(&cycles) {
            CyclePick::Active { cycle, demote } => {
                assert_eq!(cycle.id, 11);
                assert_eq!(demote, vec![10]);
            }
            other => panic!("unexpected pick: {other:?}"),
        }
    }

    #[test]
    fn test_pick_cycle_promotes_lowest_planned() {
        let cycles = vec![
            cycle(1, 1, CycleStatus::Done),
            cycle(3, 3, CycleStatus::Planned),
            cycle(2, 2, CycleStatus::Planned),
        ];
        assert_eq!(pick_cycle(&cycles), CyclePick::Promote(cycle(2, 2, CycleStatus::Planned)));
    }

    #[test]
    fn test_pick_cycle_rest_pauses_set() {
        let cycles = vec![cycle(1, 1, CycleStatus::Rest), cycle(2, 2, CycleStatus::Planned)];
        assert_eq!(pick_cycle(&cycles), CyclePick::Resting);
        assert_eq!(pick_cycle(&[cycle(1, 1, CycleStatus::Done)]), CyclePick::Idle);
        assert_eq!(pick_cycle(&[]), CyclePick::Idle);
    }

    #[test]
    fn test_status_from_plan() {
        let plan = DailyPlan {
            user_id: 7,
            active: true,
            today_batch: ids(&["p1", "p2", "p3"]),
            per_day: 3,
            generated_at: utc("2026-03-02T00:05:00Z"),
        };
        let status = DailyStatus::from_plan(&plan, &set_of(&["p2", "p9"]));
        assert!(status.has_active_cycle);
        assert_eq!(status.done_today, 1);
        assert_eq!(status.remaining, 2);
        assert_eq!(status.per_day, 3);
        assert_eq!(next_due(&plan, &set_of(&["p1"])), Some("p2"));
        assert_eq!(next_due(&plan, &set_of(&["p1", "p2", "p3"])), None);
    }

    #[test]
    fn test_day_boundaries_in_local_time() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let now = tz.with_ymd_and_hms(2026, 3, 2, 0, 30, 0).unwrap();

        assert_eq!(start_of_day(&now), utc("2026-03-01T22:00:00Z"));
        assert!(is_from_earlier_day(utc("2026-03-01T21:59:59Z"), &now));
        assert!(!is_from_earlier_day(utc("2026-03-01T22:00:00Z"), &now));
    }

    #[test]
    fn test_next_run_after() {
        let tz = FixedOffset::east_opt(-5 * 3600).unwrap();
        let at = NaiveTime::from_hms_opt(0, 5, 0).unwrap();

        let before = tz.with_ymd_and_hms(2026, 3, 2, 0, 1, 0).unwrap();
        assert_eq!(next_run_after(&before, at), tz.with_ymd_and_hms(2026, 3, 2, 0, 5, 0).unwrap());

        let exactly = tz.with_ymd_and_hms(2026, 3, 2, 0, 5, 0).unwrap();
        assert_eq!(next_run_after(&exactly, at), tz.with_ymd_and_hms(2026, 3, 3, 0, 5, 0).unwrap());

        let evening = tz.with_ymd_and_hms(2026, 12, 31, 23, 0, 0).unwrap();
        assert_eq!(next_run_after(&evening, at), tz.with_ymd_and_hms(2027, 1, 1, 0, 5, 0).unwrap());
    }
}
