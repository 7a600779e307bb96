//! Wildcard string matching.
//!
//! # Semantics
//! - Exact equality always matches
//! - Otherwise an empty pattern or empty text never matches
//! - The pattern is split on `*`; the text must start with the first
//!   fragment, end with the last, and contain every fragment somewhere
//!
//! Containment is checked per fragment, not in sequence, so `a*x*y*z`
//! accepts `a_y_x_z`. This is a cheap heuristic, not a glob engine.

/// The wildcard character.
pub const WILDCARD: char = '*';

/// Returns true if `text` matches `pattern`.
pub fn matches(pattern: &str, text: &str) -> bool {
    if pattern == text {
        return true;
    }
    if pattern.is_empty() || text.is_empty() {
        return false;
    }

    let first = pattern.split(WILDCARD).next().unwrap_or_default();
    let last = pattern.rsplit(WILDCARD).next().unwrap_or_default();

    text.starts_with(first)
        && text.ends_with(last)
        && pattern.split(WILDCARD).all(|fragment| text.contains(fragment))
}
