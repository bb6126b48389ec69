//! Preview snippets and match highlighting.
//!
//! Pure functions over `(text, query)`. Matching is case-insensitive and
//! literal: the query is escaped before being compiled, so characters such as
//! `.` or `(` match themselves. Widths are counted in characters, never bytes.

use regex::{Captures, Regex, RegexBuilder};

/// Default number of characters of context on each side of a match
pub const DEFAULT_RADIUS: usize = 80;

/// Default length of the full-text preview
pub const DEFAULT_PREVIEW_CHARS: usize = 3000;

/// Compile `query` into a case-insensitive literal matcher.
///
/// Regex case folding is per character, while cached text is lowercased with
/// [`str::to_lowercase`], which can change length (`İ` becomes `i̇`). The
/// lowercased query is added as an alternative so every document the search
/// matches also yields a snippet.
fn literal_matcher(query: &str) -> Option<Regex> {
    let lowered = query.to_lowercase();
    let pattern = if lowered == query {
        regex::escape(query)
    } else {
        format!("{}|{}", regex::escape(query), regex::escape(&lowered))
    };
    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .ok()
}

/// Byte offset reached by walking `count` characters back from `from`.
fn back_chars(text: &str, from: usize, count: usize) -> usize {
    text[..from]
        .char_indices()
        .rev()
        .take(count)
        .last()
        .map_or(from, |(i, _)| i)
}

/// Byte offset reached by walking `count` characters forward from `from`.
fn forward_chars(text: &str, from: usize, count: usize) -> usize {
    text[from..]
        .char_indices()
        .nth(count)
        .map_or(text.len(), |(i, _)| from + i)
}

/// Excerpt of `text` around the first occurrence of `query`.
///
/// Keeps `radius` characters on each side of the match (clipped to the text),
/// collapses whitespace runs to single spaces and trims the ends. Returns an
/// empty string when `query` does not occur in `text`.
///
/// ```
/// use scout_core::snippet::extract_snippet;
/// assert_eq!(extract_snippet("abc needle def", "needle", 2), "c needle d");
/// ```
pub fn extract_snippet(text: &str, query: &str, radius: usize) -> String {
    let found = match literal_matcher(query).and_then(|re| re.find(text)) {
        Some(found) => found,
        None => return String::new(),
    };

    let start = back_chars(text, found.start(), radius);
    let end = forward_chars(text, found.end(), radius);

    text[start..end].split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Wrap every case-insensitive occurrence of `query` in `snippet` with `**`.
///
/// The original casing of the snippet is kept. An empty snippet or an empty
/// query returns the snippet unchanged.
///
/// ```
/// use scout_core::snippet::highlight_match;
/// assert_eq!(highlight_match("ABC Needle DEF", "needle"), "ABC **Needle** DEF");
/// ```
pub fn highlight_match(snippet: &str, query: &str) -> String {
    if snippet.is_empty() || query.is_empty() {
        return snippet.to_string();
    }

    match literal_matcher(query) {
        Some(re) => re
            .replace_all(snippet, |caps: &Captures| format!("**{}**", &caps[0]))
            .into_owned(),
        None => snippet.to_string(),
    }
}

/// The first `limit` characters of `text`.
pub fn preview_excerpt(text: &str, limit: usize) -> &str {
    &text[..forward_chars(text, 0, limit)]
}
