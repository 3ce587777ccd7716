//! Shared User-Agent string for every outbound HTTP client.
//!
//! Catalog, oracle, upload and extractor traffic all identify the same way so
//! site operators can reach the project from a single header value.

/// Project URL for User-Agent identification.
const PROJECT_UA_URL: &str = "https://github.com/fierce/metamaster";

/// Default User-Agent for all requests (single shared format; no per-site name in header).
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("metamaster/{version} (catalog-tagger; +{PROJECT_UA_URL})")
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_contains_crate_version() {
        let ua = default_user_agent();
        assert_eq!(
            env!("CARGO_PKG_VERSION"),
            ua.strip_prefix("metamaster/")
                .and_then(|s| s.split(' ').next())
                .expect("UA has version"),
        );
    }

    #[test]
    fn test_user_agent_contains_project_url() {
        let ua = default_user_agent();
        assert!(ua.contains(PROJECT_UA_URL), "UA must contain project URL: {ua}");
        assert!(ua.contains("catalog-tagger"), "UA must identify the tool: {ua}");
    }
}
