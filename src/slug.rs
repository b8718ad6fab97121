//! Slug normalization.
//!
//! Slugs are lowercase ASCII tokens separated by single hyphens. They are derived from
//! display names and used as URL path segments, unique among siblings.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

static SLUG_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap_or_else(|e| panic!("invalid slug pattern: {e}"))
});

/// Derive a slug from an arbitrary display name.
///
/// Diacritics are stripped (NFD decomposition, combining marks dropped), letters are
/// lowercased, every run of other characters collapses to one hyphen, and leading or
/// trailing hyphens are trimmed. Never fails; blank input yields an empty slug.
///
/// # Examples
///
/// ```
/// use docwiki::slug::slugify;
///
/// assert_eq!(slugify("Internal Systems"), "internal-systems");
/// assert_eq!(slugify("Recursos Humanos / Férias"), "recursos-humanos-ferias");
/// assert_eq!(slugify("  ***  "), "");
/// ```
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_dash = false;

    for ch in name.nfd().filter(|c| !is_combining_mark(*c)) {
        let c = ch.to_ascii_lowercase();
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c);
        } else {
            pending_dash = true;
        }
    }
    out
}

/// Whether `slug` is already in normalized form.
///
/// Explicit (pinned) slugs supplied by callers must pass this check.
pub fn is_valid_slug(slug: &str) -> bool {
    SLUG_PATTERN.is_match(slug)
}
