//! Puzzle records as the graders see them.

use serde::{Deserialize, Serialize};
use shakmaty::{fen::Fen, Color};

use crate::error::CoreError;
use crate::solution::Solution;

pub const DIFFICULTIES: &[&str] = &["easy", "intermediate", "advanced"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Puzzle {
    pub id: String,
    pub difficulty: String,
    pub fen: String,
    pub solution: Solution,
    /// SANs of the moves the user must recall; passed through to clients.
    #[serde(default)]
    pub ticks: Vec<String>,
    /// Written walkthrough of the solution, when the source book has one.
    #[serde(default)]
    pub solution_text: Option<String>,
}

pub fn is_valid_difficulty(difficulty: &str) -> bool {
    DIFFICULTIES.contains(&difficulty)
}

/// Side to move ("w" or "b") of a FEN. An empty FEN defaults to white.
pub fn side_to_move(fen: &str) -> Result<&'static str, CoreError> {
    if fen.trim().is_empty() {
        return Ok("w");
    }

    let parsed: Fen = fen
        .trim()
        .parse()
        .map_err(|e| CoreError::InvalidFen(format!("{fen}: {e}")))?;

    Ok(match parsed.as_setup().turn {
        Color::White => "w",
        Color::Black => "b",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_to_move() {
        assert_eq!(
            side_to_move("r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3").unwrap(),
            "w"
        );
        assert_eq!(
            side_to_move("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1").unwrap(),
            "b"
        );
        assert_eq!(side_to_move("").unwrap(), "w");
    }

    #[test]
    fn test_side_to_move_rejects_garbage() {
        assert!(matches!(side_to_move("not a fen"), Err(CoreError::InvalidFen(_))));
    }

    #[test]
    fn test_difficulties() {
        assert!(is_valid_difficulty("easy"));
        assert!(is_valid_difficulty("advanced"));
        assert!(!is_valid_difficulty("expert"));
    }
}
