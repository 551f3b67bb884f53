//! Driven port for the user-directory search call.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::define_port_error;
use crate::domain::{DirectoryHit, Query};

/// Reset information attached to a quota rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitHint {
    /// Upstream announced the instant at which the quota resets.
    ResetAt(DateTime<Utc>),
    /// Upstream asked the client to wait for a relative duration.
    RetryAfter(Duration),
    /// Upstream gave no reset information.
    Unknown,
}

impl fmt::Display for RateLimitHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResetAt(at) => write!(f, "resets at {}", at.to_rfc3339()),
            Self::RetryAfter(wait) => write!(f, "retry after {}s", wait.as_secs()),
            Self::Unknown => f.write_str("reset time unknown"),
        }
    }
}

define_port_error! {
    /// Errors surfaced while calling the directory search endpoint.
    pub enum DirectorySearchError {
        /// Search quota is exhausted.
        RateLimited { hint: RateLimitHint } =>
            "directory search rate limited ({hint})",
        /// Upstream rejected the request with a client error.
        Rejected { status: u16, message: String } =>
            "directory search rejected with status {status}: {message}",
        /// Network transport failed or upstream returned a server error.
        Transport { message: String } =>
            "directory search transport failed: {message}",
        /// The call exceeded the client timeout.
        Timeout { message: String } =>
            "directory search timed out: {message}",
        /// The response body could not be decoded.
        Decode { message: String } =>
            "directory search response decode failed: {message}",
    }
}

/// Port for searching the user directory.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DirectorySearchSource: Send + Sync {
    /// Return the first page of hits for `query`, in upstream order.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// use directory_search::domain::Query;
    /// use directory_search::domain::ports::{
    ///     DirectorySearchSource, FixtureDirectorySearchSource,
    /// };
    ///
    /// let hits = FixtureDirectorySearchSource
    ///     .search_users(&Query::new("ada"))
    ///     .await?;
    /// assert!(hits.is_empty());
    /// # Ok::<(), directory_search::domain::ports::DirectorySearchError>(())
    /// ```
    async fn search_users(&self, query: &Query) -> Result<Vec<DirectoryHit>, DirectorySearchError>;
}

/// Fixture implementation returning no hits.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureDirectorySearchSource;

#[async_trait]
impl DirectorySearchSource for FixtureDirectorySearchSource {
    async fn search_users(
        &self,
        _query: &Query,
    ) -> Result<Vec<DirectoryHit>, DirectorySearchError> {
        Ok(Vec::new())
    }
}
