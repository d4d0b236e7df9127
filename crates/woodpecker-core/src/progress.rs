//! Per-user puzzle progress and attempt summaries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::grade::GradeResult;

/// Stored progress for one (user, puzzle) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub puzzle_id: String,
    pub attempts: i32,
    /// Score of the most recent attempt.
    pub score: i32,
    pub solved_at: Option<DateTime<Utc>>,
    pub last_typed: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

/// One graded attempt to be folded into a progress row.
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub typed: Vec<String>,
    pub score: i32,
    pub depth_matched: i32,
    /// Depth at which the puzzle counts as solved (full line length).
    pub solved_threshold: i32,
}

impl ProgressUpdate {
    pub fn from_grade(typed: Vec<String>, grade: &GradeResult, solved_threshold: i32) -> Self {
        Self {
            typed,
            score: grade.score,
            depth_matched: grade.depth_matched as i32,
            solved_threshold,
        }
    }

    pub fn reaches_solved_threshold(&self) -> bool {
        self.depth_matched >= self.solved_threshold
    }
}

/// Attempt row values derived from a flat-mode grade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptSummary {
    pub score_first_move: i32,
    pub score_ticks: i32,
    pub total_points: i32,
    pub correct_first_move: bool,
    pub solved: bool,
    pub time_ms: i32,
}

impl AttemptSummary {
    pub fn from_grade(grade: &GradeResult, update: &ProgressUpdate, time_ms: Option<i32>) -> Self {
        let score_first_move = i32::from(grade.correct);
        let score_ticks = if grade.correct {
            grade.ticks_matched.len() as i32
        } else {
            0
        };

        Self {
            score_first_move,
            score_ticks,
            total_points: grade.score,
            correct_first_move: grade.correct,
            solved: update.reaches_solved_threshold(),
            time_ms: time_ms.unwrap_or(0).max(0),
        }
    }
}
