//! URL slugs.

use unicode_normalization::UnicodeNormalization;

/// Longest slug a post may carry.
pub const MAX_SLUG_LEN: usize = 50;

/// Derives a slug from free text (used to prepopulate `Post::slug` from the title).
///
/// Accents are folded to ASCII, other characters that are neither word characters, spaces nor
/// dashes are dropped, and runs of spaces and dashes become a single dash.
///
/// ```
/// use quill_blog::slugify;
///
/// assert_eq!(slugify("Hello World"), "hello-world");
/// assert_eq!(slugify("  Rust & SurrealDB!  "), "rust-surrealdb");
/// assert_eq!(slugify("Test 123"), "test-123");
/// assert_eq!(slugify("Ünïcödé"), "unicode");
/// ```
#[must_use]
pub fn slugify(text: &str) -> String {
    let folded = text
        .nfkd()
        .filter(char::is_ascii)
        .map(|ch| ch.to_ascii_lowercase())
        .filter(|ch| ch.is_ascii_alphanumeric() || *ch == '_' || *ch == '-' || ch.is_ascii_whitespace())
        .collect::<String>();
    let slug = folded
        .split(|ch: char| ch == '-' || ch.is_ascii_whitespace())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    // ASCII only, so byte slicing is safe
    let slug = if slug.len() > MAX_SLUG_LEN { &slug[..MAX_SLUG_LEN] } else { slug.as_str() };
    slug.trim_matches(['-', '_']).to_owned()
}

/// `true` for a non-empty string of ASCII letters, digits, `-` and `_`.
#[must_use]
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty() && slug.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}
