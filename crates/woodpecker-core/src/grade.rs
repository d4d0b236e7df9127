//! Line grading: typed SAN sequences against a puzzle's solution.
//!
//! Flat mode is the primary path. Branching mode is the older first-move /
//! full-line grader and keeps its own scoring (ticks only, no first-move
//! point).

use serde::Serialize;

use crate::san::normalize;
use crate::solution::{Solution, SolutionNode};

/// Outcome of a flat-mode grading call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeResult {
    /// The first move matched.
    pub correct: bool,
    /// 1 for a correct first move plus 1 per matched tick.
    pub score: i32,
    /// Typed moves that matched, as the user typed them.
    pub matched_line: Vec<String>,
    /// Indices into the solution of matched tick moves.
    pub ticks_matched: Vec<usize>,
    pub depth_matched: usize,
    pub earliest_mistake: Option<usize>,
    /// Matched moves in the solution's own notation.
    pub best_line: Vec<String>,
}

/// Grade a typed sequence ply-by-ply against a flat solution line.
pub fn grade_line<S: AsRef<str>>(line: &[SolutionNode], typed: &[S]) -> GradeResult {
    let mut result = GradeResult::default();

    for (i, typed_move) in typed.iter().enumerate() {
        let Some(node) = line.get(i) else {
            result.earliest_mistake = Some(i);
            break;
        };

        let typed_move = typed_move.as_ref();
        if !node.is_reachable() || normalize(typed_move) != normalize(&node.mv) {
            result.earliest_mistake = Some(i);
            break;
        }

        result.matched_line.push(typed_move.to_string());
        result.best_line.push(node.mv.clone());
        result.depth_matched = i + 1;
        if i == 0 {
            result.correct = true;
        }
        if node.is_tick {
            result.ticks_matched.push(i);
        }
    }

    if result.correct {
        result.score = 1 + result.ticks_matched.len() as i32;
    }

    result
}

/// Outcome of the legacy branching grader.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchGrade {
    pub correct: bool,
    pub score: i32,
    pub matched_line: Vec<String>,
}

/// A matched path through the forest, built bottom-up.
#[derive(Debug, Default)]
struct PathMatch {
    moves: Vec<String>,
    ticks: i32,
}

/// Depth-first match of `typed[depth..]` against `nodes`.
///
/// The first sibling matching the typed move is taken; later siblings are
/// never tried even if the chosen branch fails deeper down.
fn match_path(nodes: &[SolutionNode], typed: &[String], depth: usize) -> PathMatch {
    let Some(want) = typed.get(depth) else {
        return PathMatch::default();
    };

    let Some(node) = nodes
        .iter()
        .filter(|n| n.is_reachable())
        .find(|n| normalize(&n.mv) == *want)
    else {
        return PathMatch::default();
    };

    let rest = if depth + 1 < typed.len() {
        match_path(&node.children, typed, depth + 1)
    } else {
        PathMatch::default()
    };

    let mut moves = Vec::with_capacity(1 + rest.moves.len());
    moves.push(node.mv.clone());
    moves.extend(rest.moves);

    PathMatch {
        moves,
        ticks: rest.ticks + i32::from(node.is_tick),
    }
}

/// Grade against the full branching solution, falling back to the accepted
/// alternative lines when no authored line starts with the first move.
pub fn grade_first_move_or_full<S: AsRef<str>>(solution: &Solution, typed: &[S]) -> BranchGrade {
    if typed.is_empty() {
        return BranchGrade::default();
    }

    let typed: Vec<String> = typed.iter().map(|m| normalize(m.as_ref())).collect();

    let path = match_path(&solution.lines, &typed, 0);
    if !path.moves.is_empty() {
        return BranchGrade {
            correct: true,
            score: path.ticks,
            matched_line: path.moves,
        };
    }

    solution
        .accepted_alternatives
        .iter()
        .find(|alt| alt.first().is_some_and(|first| normalize(first) == typed[0]))
        .map(|alt| BranchGrade {
            correct: true,
            score: 0,
            matched_line: alt
                .iter()
                .zip(&typed)
                .take_while(|(expected, played)| normalize(expected) == **played)
                .map(|(expected, _)| expected.clone())
                .collect(),
        })
        .unwrap_or_default()
}
