//! Grading and planning properties, exercised through the public core API.
//!
//! Pure tests, no server needed.

use std::collections::HashSet;

use woodpecker_core::plan::{select_batch, session_target};
use woodpecker_core::progress::ProgressUpdate;
use woodpecker_core::{grade_first_move_or_full, grade_line, normalize, Solution, SolutionNode};

fn opening_line() -> Vec<SolutionNode> {
    vec![
        SolutionNode::new("e4", true),
        SolutionNode::new("e5", false),
        SolutionNode::new("Nf3", true),
    ]
}

#[test]
fn normalize_is_idempotent() {
    let samples = [
        "Nf3+", "O-O-O#", "0-0", "e8=Q+", "12...Qxf7!!", "1.e4", "  Rad1 ", "exd6 e.p.",
        "a=b=c", "a0-.0", "0-.0-0", "", "?!", "Kxh8=",
    ];
    for raw in samples {
        let once = normalize(raw);
        assert_eq!(normalize(&once), once, "not idempotent for {raw:?}");
    }
}

#[test]
fn normalize_equivalences() {
    assert_eq!(normalize("Nf3+"), normalize("nf3"));
    assert_eq!(normalize("O-O"), normalize("0-0"));
    assert_eq!(normalize("e8=Q"), normalize("e8Q"));
    assert_ne!(normalize("O-O"), normalize("O-O-O"));
}

#[test]
fn flat_empty_input_is_zero_grade() {
    let result = grade_line::<&str>(&opening_line(), &[]);
    assert!(!result.correct);
    assert_eq!(result.score, 0);
    assert!(result.ticks_matched.is_empty());
    assert_eq!(result.depth_matched, 0);
    assert_eq!(result.earliest_mistake, None);
}

#[test]
fn flat_full_line_scores_first_move_and_ticks() {
    let result = grade_line(&opening_line(), &["e4", "e5", "Nf3"]);
    assert!(result.correct);
    assert_eq!(result.ticks_matched, vec![0, 2]);
    assert_eq!(result.score, 3);
    assert_eq!(result.depth_matched, 3);
    assert_eq!(result.earliest_mistake, None);
}

#[test]
fn flat_wrong_first_move() {
    let result = grade_line(&opening_line(), &["d4"]);
    assert!(!result.correct);
    assert_eq!(result.score, 0);
    assert_eq!(result.earliest_mistake, Some(0));
    assert_eq!(result.depth_matched, 0);
}

#[test]
fn flat_mistake_on_second_move() {
    let result = grade_line(&opening_line(), &["e4", "d5"]);
    assert!(result.correct);
    // e4 is itself a tick: first-move point plus one tick.
    assert_eq!(result.score, 2);
    assert_eq!(result.earliest_mistake, Some(1));
    assert_eq!(result.depth_matched, 1);

    let plain_first = vec![SolutionNode::new("e4", false), SolutionNode::new("e5", false)];
    let result = grade_line(&plain_first, &["e4", "d5"]);
    assert_eq!(result.score, 1);
}

#[test]
fn flat_exact_prefixes_have_no_mistake() {
    let line = opening_line();
    let sans: Vec<&str> = line.iter().map(|n| n.mv.as_str()).collect();

    for k in 0..=sans.len() {
        let result = grade_line(&line, &sans[..k]);
        assert_eq!(result.depth_matched, k, "prefix {k}");
        assert_eq!(result.earliest_mistake, None, "prefix {k}");
    }
}

#[test]
fn flat_typing_past_the_end_is_a_mistake() {
    let result = grade_line(&opening_line(), &["e4", "e5", "Nf3", "Nc6"]);
    assert_eq!(result.depth_matched, 3);
    assert_eq!(result.earliest_mistake, Some(3));
    assert_eq!(result.score, 3);
}

#[test]
fn legacy_first_matching_sibling_wins() {
    let solution = Solution {
        lines: vec![
            SolutionNode::new("Qh5", false).with_children(vec![SolutionNode::new("g6", false)]),
            SolutionNode::new("Qh5", true).with_children(vec![SolutionNode::new("Nc6", true)]),
        ],
        accepted_alternatives: Vec::new(),
    };

    // The second sibling would match both moves, but it is never tried.
    let result = grade_first_move_or_full(&solution, &["Qh5", "Nc6"]);
    assert!(result.correct);
    assert_eq!(result.matched_line, vec!["Qh5"]);
    assert_eq!(result.score, 0);
}

#[test]
fn legacy_full_branch_counts_ticks() {
    let solution = Solution::from_json(
        r#"{"lines": [{"san": "Rxe8+", "isTick": true, "children": [
               {"move": "Kh7"},
               {"san": "Qxe8", "children": [{"san": "Qxe8#", "isTick": true}]}
           ]}]}"#,
    )
    .unwrap();

    let result = grade_first_move_or_full(&solution, &["Rxe8", "Qxe8", "Qxe8#"]);
    assert!(result.correct);
    assert_eq!(result.score, 2);
    assert_eq!(result.matched_line, vec!["Rxe8+", "Qxe8", "Qxe8#"]);
}

#[test]
fn solved_threshold_is_full_line() {
    let solution = Solution {
        lines: opening_line(),
        accepted_alternatives: Vec::new(),
    };
    let threshold = solution.solved_threshold();

    let partial = grade_line(solution.flat_line(), &["e4", "e5"]);
    let update = ProgressUpdate::from_grade(vec!["e4".into(), "e5".into()], &partial, threshold);
    assert!(!update.reaches_solved_threshold());

    let full = grade_line(solution.flat_line(), &["e4", "e5", "Nf3"]);
    let update = ProgressUpdate::from_grade(Vec::new(), &full, threshold);
    assert!(update.reaches_solved_threshold());
}

#[test]
fn batch_respects_target_and_skips_solved() {
    let set: Vec<String> = (1..=30).map(|i| format!("p{i}")).collect();
    let solved: HashSet<String> = ["p1", "p4", "p5"].iter().map(|s| s.to_string()).collect();

    for days_left in 1..=10 {
        let target = session_target(set.len() - solved.len(), days_left);
        let batch = select_batch(&set, &solved, target);
        assert!(batch.len() <= target as usize);
        assert!(batch.iter().all(|id| !solved.contains(id)));
    }
}
