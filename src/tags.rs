//! Tag directives declared in a document's leading lines.
//!
//! A document may start with a line such as `#tags: rust, notes` (or
//! `tags: ...`) within its first five lines. Only the first such line
//! counts.

/// How many leading lines are scanned for a tag directive.
pub const TAG_SCAN_LINES: usize = 5;

const TAG_PREFIXES: &[&str] = &["#tags:", "tags:"];

/// Index of the first directive line among the leading lines, if any.
fn find_tag_line(text: &str) -> Option<(usize, &str)> {
    text.lines().take(TAG_SCAN_LINES).enumerate().find(|(_, line)| {
        let lower = line.to_lowercase();
        TAG_PREFIXES.iter().any(|prefix| lower.starts_with(prefix))
    })
}

/// Extract lowercase tags from the first directive line.
///
/// # Examples
///
/// ```
/// use ragshelf::tags::extract_tags;
///
/// let tags = extract_tags("#Tags: Alpha, beta,,  gamma \nbody");
/// assert_eq!(tags, vec!["alpha", "beta", "gamma"]);
/// assert!(extract_tags("no directive here").is_empty());
/// ```
pub fn extract_tags(text: &str) -> Vec<String> {
    let Some((_, line)) = find_tag_line(text) else {
        return Vec::new();
    };
    let Some((_, list)) = line.split_once(':') else {
        return Vec::new();
    };

    let mut tags: Vec<String> = Vec::new();
    for piece in list.split(',') {
        let tag = piece.trim().to_lowercase();
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

/// Return the text without its tag directive line.
///
/// Text without a directive is returned unchanged.
pub fn strip_tag_line(text: &str) -> String {
    match find_tag_line(text) {
        Some((index, _)) => text
            .lines()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .map(|(_, line)| line)
            .collect::<Vec<_>>()
            .join("\n"),
        None => text.to_string(),
    }
}
