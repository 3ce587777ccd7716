//! HTTP client construction shared by every remote collaborator.
//!
//! Catalog, oracle, upload host and extractors all build their client here,
//! so one `--connect-timeout-secs` / `--read-timeout-secs` pair governs the
//! whole run.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use reqwest::cookie::Jar;
use reqwest::{Client, ClientBuilder, Proxy};
use thiserror::Error;
use tracing::warn;

use crate::user_agent;

/// Default connect timeout in seconds.
pub const CONNECT_TIMEOUT_SECS: u64 = 10;
/// Default read timeout in seconds.
pub const READ_TIMEOUT_SECS: u64 = 30;

/// Proxy variables consulted when the system proxy lookup is unavailable.
const PROXY_VARS: [&str; 4] = ["HTTPS_PROXY", "https_proxy", "ALL_PROXY", "all_proxy"];

/// Connect and read limits applied to clients built after configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    /// Time allowed to establish a connection.
    pub connect: Duration,
    /// Time allowed for a whole request, body included.
    pub read: Duration,
}

impl HttpTimeouts {
    const DEFAULT: Self = Self {
        connect: Duration::from_secs(CONNECT_TIMEOUT_SECS),
        read: Duration::from_secs(READ_TIMEOUT_SECS),
    };
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self::DEFAULT
    }
}

static TIMEOUTS: RwLock<HttpTimeouts> = RwLock::new(HttpTimeouts::DEFAULT);

/// Sets the timeouts for every client built afterwards.
///
/// Call once at startup, before the catalog, oracle and extractors exist.
pub fn configure_http_timeouts(connect_secs: u64, read_secs: u64) {
    if let Ok(mut current) = TIMEOUTS.write() {
        *current = HttpTimeouts {
            connect: Duration::from_secs(connect_secs),
            read: Duration::from_secs(read_secs),
        };
    }
}

/// Timeouts currently in effect.
#[must_use]
pub fn http_timeouts() -> HttpTimeouts {
    TIMEOUTS.read().map(|current| *current).unwrap_or_default()
}

/// Failure to construct an HTTP client for a collaborator.
#[derive(Debug, Error)]
pub enum ClientBuildError {
    /// reqwest rejected the builder configuration.
    #[error("cannot build HTTP client for {service}: {source}")]
    Build {
        /// Collaborator that asked for the client.
        service: String,
        /// Underlying builder error.
        #[source]
        source: reqwest::Error,
    },

    /// Reading proxy settings panicked even with the system lookup disabled.
    #[error("HTTP client for {service} panicked while reading proxy settings")]
    ProxyLookupPanicked {
        /// Collaborator that asked for the client.
        service: String,
    },
}

/// Builds a client with the shared user-agent, timeouts and gzip support.
///
/// `service` only labels logs and errors. A cookie jar is attached when the
/// collaborator keeps a session (the catalog login).
///
/// # Errors
///
/// Returns [`ClientBuildError`] when reqwest cannot build the client.
pub fn build_http_client(
    service: &str,
    cookie_jar: Option<Arc<Jar>>,
) -> Result<Client, ClientBuildError> {
    let timeouts = http_timeouts();
    let attempt = |system_proxy: bool| {
        let builder = configured_builder(timeouts, cookie_jar.clone(), system_proxy);
        catch_unwind(AssertUnwindSafe(move || builder.build()))
    };

    // Sandboxed hosts can panic inside the system proxy lookup.
    let built = attempt(true).or_else(|_| {
        warn!(service, "system proxy lookup panicked; using proxy variables only");
        attempt(false).map_err(|_| ClientBuildError::ProxyLookupPanicked {
            service: service.to_string(),
        })
    })?;

    built.map_err(|source| ClientBuildError::Build {
        service: service.to_string(),
        source,
    })
}

fn configured_builder(
    timeouts: HttpTimeouts,
    cookie_jar: Option<Arc<Jar>>,
    system_proxy: bool,
) -> ClientBuilder {
    let mut builder = Client::builder()
        .connect_timeout(timeouts.connect)
        .timeout(timeouts.read)
        .user_agent(user_agent::default_user_agent())
        .gzip(true);

    if let Some(jar) = cookie_jar {
        builder = builder.cookie_provider(jar);
    }
    if !system_proxy {
        builder = builder.no_proxy();
        if let Some(proxy) = proxy_from_env() {
            builder = builder.proxy(proxy);
        }
    }
    builder
}

fn proxy_from_env() -> Option<Proxy> {
    PROXY_VARS
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .and_then(|value| Proxy::all(&value).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_http_client_without_cookie_jar() {
        assert!(build_http_client("saucenao", None).is_ok());
    }

    #[test]
    fn test_build_http_client_with_cookie_jar() {
        let jar = Arc::new(Jar::default());
        assert!(build_http_client("shimmie", Some(jar)).is_ok());
    }

    #[test]
    fn test_default_timeouts_match_constants() {
        let timeouts = HttpTimeouts::default();
        assert_eq!(timeouts.connect, Duration::from_secs(CONNECT_TIMEOUT_SECS));
        assert_eq!(timeouts.read, Duration::from_secs(READ_TIMEOUT_SECS));
    }

    #[test]
    fn test_client_build_error_names_service() {
        let err = ClientBuildError::ProxyLookupPanicked {
            service: "chibisafe".to_string(),
        };
        assert!(err.to_string().contains("chibisafe"));
    }
}
