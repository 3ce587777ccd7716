//! Small URL and tag helpers shared by site extractors.

use url::Url;

/// Normalizes a host string: trim, strip leading "www.", trailing '.', and lowercases.
#[must_use]
pub(crate) fn canonical_host(host: &str) -> String {
    host.trim()
        .trim_start_matches("www.")
        .trim_end_matches('.')
        .to_ascii_lowercase()
}

/// Returns true if `host` is `domain` or one of its subdomains.
#[must_use]
pub(crate) fn host_matches_domain(host: &str, domain: &str) -> bool {
    let host = canonical_host(host);
    host == domain || host.ends_with(&format!(".{domain}"))
}

/// Returns the last non-empty path segment of `url`.
///
/// `https://yande.re/post/show/123` yields `123`.
#[must_use]
pub(crate) fn last_path_segment(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed
        .path_segments()?
        .rev()
        .find(|segment| !segment.is_empty())
        .map(str::to_string)
}

/// Returns the first value of query parameter `name`.
#[must_use]
pub(crate) fn query_param(url: &str, name: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed
        .query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

/// Returns `value` when it parses as an http(s) URL.
#[must_use]
pub(crate) fn valid_http_url(value: &str) -> Option<String> {
    let parsed = Url::parse(value.trim()).ok()?;
    matches!(parsed.scheme(), "http" | "https").then(|| parsed.to_string())
}

/// Splits a space-separated tag string, optionally prefixing each tag.
#[must_use]
pub(crate) fn split_tags(raw: &str, prefix: Option<&str>) -> Vec<String> {
    raw.split_whitespace()
        .map(|tag| match prefix {
            Some(prefix) => format!("{prefix}:{tag}"),
            None => tag.to_string(),
        })
        .collect()
}

/// Returns true when the post id is a plain decimal number.
#[must_use]
pub(crate) fn is_numeric_id(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit())
}
