/// Fallback token used when a keyword sanitizes to nothing.
pub const FALLBACK_SLUG: &str = "results";

/// Make free text safe for use inside a file name.
///
/// Surrounding whitespace is stripped, then every char outside
/// `[A-Za-z0-9_-]` becomes `_`. Blank input yields an empty string.
pub fn sanitize_filename(text: &str) -> String {
    text.trim()
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' { ch } else { '_' })
        .collect()
}

/// Sanitized keyword, or [`FALLBACK_SLUG`] when nothing usable is left.
pub fn keyword_slug(keyword: &str) -> String {
    let slug = sanitize_filename(keyword);
    if slug.is_empty() { FALLBACK_SLUG.to_string() } else { slug }
}
