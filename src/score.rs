//! Page relevance scoring and excerpt extraction.
//!
//! The scorer is the heart of the ranking pipeline: a page's relevance is
//! the number of *distinct* query keywords (case-insensitive) that appear
//! anywhere in its text. A keyword occurring ten times still counts once,
//! so the score is always bounded by the number of unique keywords.
//!
//! Excerpt extraction is a support utility for textual output (`nlens rank`):
//! it locates every keyword occurrence and emits a window of surrounding
//! text with the match wrapped in `**` emphasis markers.

use std::collections::HashSet;

/// Default window size (in bytes, clamped to char boundaries) for excerpts.
pub const DEFAULT_EXCERPT_LENGTH: usize = 200;

/// Compute the relevance score of a page against a keyword set.
///
/// Keywords are de-duplicated case-insensitively before counting, so the
/// result is invariant to keyword order and duplication. Returns `0` for
/// empty text or an empty keyword set. Pure function, cannot fail.
pub fn relevance_score(page_text: &str, keywords: &[String]) -> usize {
    if page_text.is_empty() || keywords.is_empty() {
        return 0;
    }

    let text_lower = page_text.to_lowercase();
    let unique: HashSet<String> = keywords.iter().map(|k| k.to_lowercase()).collect();

    unique
        .iter()
        .filter(|k| !k.is_empty() && text_lower.contains(k.as_str()))
        .count()
}

/// Extract highlighted excerpts around every keyword occurrence.
///
/// Keywords are scanned in caller-supplied order (no de-duplication). For
/// each case-insensitive occurrence, a window of roughly `excerpt_length`
/// characters centered on the match is emitted, trimmed to the text bounds,
/// with the matched substring (original casing preserved) wrapped in `**`.
/// Identical excerpt strings are de-duplicated. Returns an empty vector if
/// no keyword occurs.
pub fn extract_excerpts(text: &str, keywords: &[String], excerpt_length: usize) -> Vec<String> {
    let mut excerpts: Vec<String> = Vec::new();

    for keyword in keywords {
        if keyword.is_empty() {
            continue;
        }

        let mut start_pos = 0;
        while let Some(pos) = find_ci(text, keyword, start_pos) {
            let start = floor_char_boundary(text, pos.saturating_sub(excerpt_length / 2));
            let end = ceil_char_boundary(
                text,
                (pos + keyword.len() + excerpt_length / 2).min(text.len()),
            );

            let excerpt = highlight(text[start..end].trim(), keyword);
            if !excerpts.contains(&excerpt) {
                excerpts.push(excerpt);
            }

            start_pos = pos + 1;
        }
    }

    excerpts
}

/// Wrap every case-insensitive occurrence of `keyword` in `**` markers,
/// preserving the original casing of the matched text.
fn highlight(excerpt: &str, keyword: &str) -> String {
    let mut out = String::with_capacity(excerpt.len());
    let mut cursor = 0;

    while let Some(pos) = find_ci(excerpt, keyword, cursor) {
        out.push_str(&excerpt[cursor..pos]);
        out.push_str("**");
        out.push_str(&excerpt[pos..pos + keyword.len()]);
        out.push_str("**");
        cursor = pos + keyword.len();
    }
    out.push_str(&excerpt[cursor..]);
    out
}

/// Byte-wise ASCII-case-insensitive substring search starting at `from`.
///
/// Non-ASCII bytes must match exactly, so a returned position is always a
/// valid char boundary in `haystack`.
fn find_ci(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let h = haystack.as_bytes();
    let n = needle.as_bytes();
    if n.is_empty() || from + n.len() > h.len() {
        return None;
    }
    (from..=h.len() - n.len()).find(|&i| h[i..i + n.len()].eq_ignore_ascii_case(n))
}

fn floor_char_boundary(s: &str, mut i: usize) -> usize {
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn ceil_char_boundary(s: &str, mut i: usize) -> usize {
    while i < s.len() && !s.is_char_boundary(i) {
        i += 1;
    }
    i
}
