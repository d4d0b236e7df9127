//! Puzzle solution trees.
//!
//! Stored form (JSONB in `puzzles.solution`):
//!
//! ```json
//! {"lines": [{"san": "Qxf7+", "isTick": true, "children": [...]}],
//!  "acceptedAlternatives": [["Qxf7+", "Kxf7"]]}
//! ```

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// One move of an accepted solution and the continuations that follow it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolutionNode {
    /// SAN as authored. An empty move is never matched.
    #[serde(rename = "san", alias = "move", default)]
    pub mv: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_tick: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SolutionNode>,
}

impl SolutionNode {
    pub fn new(mv: &str, is_tick: bool) -> Self {
        Self {
            mv: mv.to_string(),
            is_tick,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<SolutionNode>) -> Self {
        self.children = children;
        self
    }

    /// Placeholder nodes (no move) are skipped by every grader.
    pub fn is_reachable(&self) -> bool {
        !self.mv.is_empty()
    }
}

/// A puzzle's full solution: the authored forest plus alternate lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Solution {
    #[serde(default)]
    pub lines: Vec<SolutionNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accepted_alternatives: Vec<Vec<String>>,
}

impl Solution {
    pub fn from_json(raw: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, CoreError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Flat solutions are stored one ply per root line.
    pub fn flat_line(&self) -> &[SolutionNode] {
        &self.lines
    }

    /// Depth a flat-mode attempt must reach to count as solved.
    pub fn solved_threshold(&self) -> i32 {
        self.lines.len().max(1) as i32
    }

    /// SANs of every tick node in the forest, in depth-first authored order.
    pub fn tick_sans(&self) -> Vec<String> {
        fn walk(nodes: &[SolutionNode], out: &mut Vec<String>) {
            for node in nodes {
                if node.is_tick && node.is_reachable() {
                    out.push(node.mv.clone());
                }
                walk(&node.children, out);
            }
        }

        let mut out = Vec::new();
        walk(&self.lines, &mut out);
        out
    }
}
