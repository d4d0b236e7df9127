pub mod auth;
pub mod daily;
pub mod health;
pub mod progress;
pub mod puzzles;
pub mod trainer;
