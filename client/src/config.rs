//! Client configuration loaded via OrthoConfig.
//!
//! Values layer as defaults, then a config file, then `DIRECTORY_SEARCH_*`
//! environment variables, then CLI flags.

use std::fmt;
use std::num::NonZeroUsize;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use zeroize::Zeroizing;

use crate::domain::DEFAULT_DEBOUNCE_WINDOW;
use crate::domain::search::DEFAULT_MAX_CONCURRENT_LOOKUPS;
use crate::outbound::cache::DEFAULT_CACHE_CAPACITY;

const DEFAULT_SEARCH_ENDPOINT: &str = "https://api.github.com/search/users";
const DEFAULT_PROFILE_ENDPOINT: &str = "https://api.github.com/users";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_RATE_LIMIT_COOLDOWN_SECS: u64 = 60;
const DEFAULT_USER_AGENT: &str = concat!("directory-search/", env!("CARGO_PKG_VERSION"));

/// Configuration values for the directory search client.
#[derive(Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "DIRECTORY_SEARCH")]
pub struct SearchSettings {
    /// API credential; unauthenticated calls are made when absent.
    pub token: Option<String>,
    /// Directory search endpoint.
    pub search_endpoint: Option<String>,
    /// Profile endpoint; the login is appended as a path segment.
    pub profile_endpoint: Option<String>,
    /// Quiescence window in milliseconds.
    pub debounce_ms: Option<u64>,
    /// Maximum number of cached queries.
    pub cache_capacity: Option<usize>,
    /// Per-request HTTP timeout in seconds.
    pub request_timeout_secs: Option<u64>,
    /// Quota cooldown used when upstream gives no reset time.
    pub rate_limit_cooldown_secs: Option<u64>,
    /// Cap on concurrent profile lookups.
    pub max_concurrent_lookups: Option<usize>,
    /// HTTP user-agent header value.
    pub user_agent: Option<String>,
}

impl SearchSettings {
    /// Return the credential, if one is configured and non-blank.
    pub fn token(&self) -> Option<Zeroizing<String>> {
        self.token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(|token| Zeroizing::new(token.to_owned()))
    }

    /// Return the configured search endpoint, falling back to the default.
    pub fn search_endpoint(&self) -> &str {
        self.search_endpoint
            .as_deref()
            .unwrap_or(DEFAULT_SEARCH_ENDPOINT)
    }

    /// Return the configured profile endpoint, falling back to the default.
    pub fn profile_endpoint(&self) -> &str {
        self.profile_endpoint
            .as_deref()
            .unwrap_or(DEFAULT_PROFILE_ENDPOINT)
    }

    /// Return the quiescence window, falling back to the default.
    pub fn debounce_window(&self) -> Duration {
        self.debounce_ms
            .map_or(DEFAULT_DEBOUNCE_WINDOW, Duration::from_millis)
    }

    /// Return the cache capacity; zero is raised to one.
    pub fn cache_capacity(&self) -> NonZeroUsize {
        self.cache_capacity
            .map_or(DEFAULT_CACHE_CAPACITY, |capacity| {
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)
            })
    }

    /// Return the per-request HTTP timeout, falling back to the default.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    /// Return the quota cooldown used when upstream announces no reset time,
    /// falling back to the default.
    pub fn rate_limit_cooldown(&self) -> Duration {
        Duration::from_secs(
            self.rate_limit_cooldown_secs
                .unwrap_or(DEFAULT_RATE_LIMIT_COOLDOWN_SECS),
        )
    }

    /// Return the lookup concurrency cap; zero is raised to one.
    pub fn max_concurrent_lookups(&self) -> usize {
        self.max_concurrent_lookups
            .unwrap_or(DEFAULT_MAX_CONCURRENT_LOOKUPS)
            .max(1)
    }

    /// Return the configured user-agent, falling back to the default.
    pub fn user_agent(&self) -> &str {
        self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT)
    }
}

impl fmt::Debug for SearchSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchSettings")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("search_endpoint", &self.search_endpoint)
            .field("profile_endpoint", &self.profile_endpoint)
            .field("debounce_ms", &self.debounce_ms)
            .field("cache_capacity", &self.cache_capacity)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("rate_limit_cooldown_secs", &self.rate_limit_cooldown_secs)
            .field("max_concurrent_lookups", &self.max_concurrent_lookups)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}
