//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Solution parse error: {0}")]
    SolutionParse(#[from] serde_json::Error),

    #[error("Invalid cycle status: {0}")]
    InvalidCycleStatus(String),

    #[error("Invalid FEN: {0}")]
    InvalidFen(String),
}
