//! SAN normalization for move comparison.
//!
//! The normalized form is only ever compared for equality. Display always
//! uses the SAN stored with the solution.

use regex::Regex;
use std::sync::LazyLock;

/// Move-number prefix such as `12.` or `3...`.
static MOVE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.+").expect("valid move-number regex"));

/// Canonicalize a SAN string so that equivalent spellings compare equal.
///
/// `Nf3+`, `nf3` and `1. Nf3` all normalize to `nf3`; `0-0` and `O-O` both
/// become `o-o`; `e8=Q` and `e8Q` both become `e8q`.
pub fn normalize(raw: &str) -> String {
    // Stripping can expose a pattern an earlier step removes (`a0-.0`), so
    // passes repeat until the output is stable.
    let mut current = normalize_pass(raw);
    loop {
        let next = normalize_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn normalize_pass(raw: &str) -> String {
    let mut s = raw.trim().to_lowercase();

    // Queenside first, otherwise "0-0-0" would become "o-o-0".
    s = s.replace("0-0-0", "o-o-o").replace("0-0", "o-o");

    s.retain(|c| !matches!(c, '+' | '#' | '!' | '?'));

    s = MOVE_NUMBER.replace(&s, "").into_owned();
    s.retain(|c| c != '.');

    let mut s = s
        .trim_start_matches(|c: char| c.is_ascii_digit())
        .to_string();

    // e8=q -> e8q
    s.retain(|c| c != '=');

    s.retain(|c| !c.is_whitespace());
    s
}
