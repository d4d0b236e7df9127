//! Woodpecker Method core: SAN normalization, solution trees, line grading
//! and daily-plan arithmetic. No I/O lives here.

pub mod cycle;
pub mod error;
pub mod grade;
pub mod plan;
pub mod progress;
pub mod puzzle;
pub mod san;
pub mod solution;

pub use error::CoreError;
pub use grade::{grade_first_move_or_full, grade_line, BranchGrade, GradeResult};
pub use san::normalize;
pub use solution::{Solution, SolutionNode};
