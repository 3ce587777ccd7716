//! Tag-safe names derived from oracle data.

use std::sync::LazyLock;

use regex::Regex;

/// Compiles a hard-coded regex pattern.
///
/// # Panics
///
/// Panics if the pattern is invalid; patterns are static and covered by tests.
#[must_use]
pub(crate) fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

/// Unicode punctuation and symbol classes.
static PUNCTUATION_OR_SYMBOL_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"[\p{P}\p{S}]"));

/// Turns an author display name into a tag-safe token.
///
/// Punctuation and symbols are removed, then whitespace runs become a single
/// underscore. Returns an empty string when nothing usable remains.
#[must_use]
pub fn sanitize_author(name: &str) -> String {
    let stripped = PUNCTUATION_OR_SYMBOL_RE.replace_all(name, "");
    stripped.split_whitespace().collect::<Vec<_>>().join("_")
}

/// Derives the `meta:` tag suffix from an oracle site label.
///
/// `"Yande.re"` becomes `yande_re`, `"Anime Pictures"` becomes `anime_pictures`.
#[must_use]
pub fn site_display_name(site_label: &str) -> String {
    site_label
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == '.' || c == ' ' { '_' } else { c })
        .collect()
}
