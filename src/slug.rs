use regex::Regex;
use std::sync::LazyLock;

/// Longest anchor id produced from heading text
pub const MAX_SLUG_LEN: usize = 60;

static DISALLOWED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^a-z0-9\s-]").expect("Failed to compile slug character regex")
});
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Failed to compile slug whitespace regex"));

/// Turn heading text into a URL-safe anchor id.
///
/// Returns an empty string when nothing usable survives; callers fall back to a
/// positional id in that case.
pub fn slugify(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped = DISALLOWED_RE.replace_all(&lowered, "");
    let hyphenated = WHITESPACE_RE.replace_all(stripped.trim(), "-");

    // Only ASCII survives the strip, so byte length equals char count
    let mut slug = hyphenated.into_owned();
    slug.truncate(MAX_SLUG_LEN);
    slug
}

/// Positional id used when a heading has neither an id nor sluggable text
pub fn positional_id(position: usize) -> String {
    format!("section-{}", position + 1)
}
