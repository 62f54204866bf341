//! Locale-style string collation for list sorting.

use std::cmp::Ordering;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Base letters only: decomposed, accents dropped, lowercased
fn primary_key(s: &str) -> String {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Lowercase sorts before uppercase at the same position
fn case_key(s: &str) -> Vec<bool> {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(char::is_uppercase)
        .collect()
}

/// Compare two strings the way a dictionary would.
///
/// Letters compare without regard to accents or case first; accents break
/// remaining ties, then case (lowercase first).
pub fn collate(a: &str, b: &str) -> Ordering {
    primary_key(a)
        .cmp(&primary_key(b))
        .then_with(|| accent_key(a).cmp(&accent_key(b)))
        .then_with(|| case_key(a).cmp(&case_key(b)))
}

/// Accent marks in order of appearance, unaccented text first
fn accent_key(s: &str) -> Vec<char> {
    s.nfd().filter(|c| is_combining_mark(*c)).collect()
}
