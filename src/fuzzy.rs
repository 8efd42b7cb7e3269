//! Approximate matching of a short query against a text fragment.
//!
//! Comparing a three-word query with a 500-word fragment yields a tiny
//! similarity no matter how close the match is, so the query is compared
//! against every window of `query_words + 2` tokens and only falls back to
//! the whole fragment when no window passes.

use similar::TextDiff;

/// Queries shorter than this (in characters) only match as substrings.
pub const MIN_FUZZY_QUERY_CHARS: usize = 3;

/// Extra tokens added to the query length when sizing the window.
const WINDOW_SLACK: usize = 2;

/// Character-level similarity in `[0, 1]`.
///
/// Computed as `2 * M / (len(a) + len(b))`, `M` being the number of
/// characters in the equal runs of a character diff.
///
/// # Examples
///
/// ```
/// use ragshelf::fuzzy::similarity_ratio;
///
/// assert_eq!(similarity_ratio("kitten", "kitten"), 1.0);
/// assert_eq!(similarity_ratio("abc", "xyz"), 0.0);
/// assert!(similarity_ratio("recieve", "receive") > 0.8);
/// ```
pub fn similarity_ratio(a: &str, b: &str) -> f32 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    TextDiff::from_chars(a, b).ratio()
}

/// Whether `query` matches `text` exactly or approximately.
///
/// Case-insensitive. A literal substring always matches; otherwise the best
/// sliding-window ratio (or the whole-text ratio) must reach `threshold`.
///
/// # Examples
///
/// ```
/// use ragshelf::fuzzy::fuzzy_matches;
///
/// let text = "The quick brown fox jumps over the lazy dog";
/// assert!(fuzzy_matches("BROWN FOX", text, 1.0));
/// assert!(fuzzy_matches("quikc brwn", text, 0.55));
/// assert!(!fuzzy_matches("zebra crossing", text, 0.6));
/// ```
pub fn fuzzy_matches(query: &str, text: &str, threshold: f32) -> bool {
    let query = query.to_lowercase();
    let text = text.to_lowercase();
    if query.is_empty() || text.is_empty() {
        return false;
    }
    if text.contains(&query) {
        return true;
    }
    if query.chars().count() < MIN_FUZZY_QUERY_CHARS {
        return false;
    }

    let query_words = query.split_whitespace().count();
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if !tokens.is_empty() && query_words > 0 {
        let window = (query_words + WINDOW_SLACK).min(tokens.len()).max(1);
        let hit = tokens.windows(window).any(|span| {
            similarity_ratio(&query, &span.join(" ")) >= threshold
        });
        if hit {
            return true;
        }
    }

    similarity_ratio(&query, &text) >= threshold
}
