pub mod accounts;
pub mod attempts;
pub mod cycles;
pub mod plans;
pub mod pool;
pub mod progress;
pub mod puzzles;
pub mod sessions;
pub mod sets;
