//! Label normalization and tolerant species-name matching.
//!
//! Providers spell the same animal differently ("Bengal Tiger", "tiger",
//! "TIGER!"). Two labels are treated as the same species when any pair of
//! their whitespace-separated tokens
//!
//! - contains the other as a substring (either direction), or
//! - is within [`MAX_EDIT_DISTANCE`] Levenshtein edits.
//!
//! The rule is deliberately loose: short tokens such as "bear"/"boar" match.

use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum Levenshtein distance for two tokens to count as the same word.
pub const MAX_EDIT_DISTANCE: usize = 2;

static NON_ALPHA: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z\s]").expect("static regex"));

/// Lowercase, trim, then drop everything outside `[a-z\s]`.
pub fn normalize(label: &str) -> String {
    let lowered = label.to_lowercase();
    NON_ALPHA.replace_all(lowered.trim(), "").into_owned()
}

fn tokens_similar(a: &str, b: &str) -> bool {
    a.contains(b) || b.contains(a) || strsim::levenshtein(a, b) <= MAX_EDIT_DISTANCE
}

/// Whether two labels refer to the same species. Inputs are normalized first.
///
/// Labels that normalize to the same string (including two empty labels) are
/// always similar; an empty label is never similar to a non-empty one.
pub fn are_similar(a: &str, b: &str) -> bool {
    let a = normalize(a);
    let b = normalize(b);
    if a == b {
        return true;
    }
    let b_tokens: Vec<&str> = b.split_whitespace().collect();
    a.split_whitespace()
        .any(|ta| b_tokens.iter().any(|tb| tokens_similar(ta, tb)))
}
