//! Typed results of one orchestrator invocation.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::ports::{DirectorySearchError, ProfileLookupError};

/// Where a published list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultOrigin {
    /// Served from the query cache without network calls.
    Cache,
    /// The query was empty; an empty list was published.
    Empty,
    /// Fetched, enriched and ranked during this invocation.
    Network,
}

/// Non-failing outcomes of a search invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// A list was published as the current result.
    Published {
        /// Sequence number of the invocation.
        sequence: u64,
        /// Source of the published list.
        origin: ResultOrigin,
        /// Number of entries published.
        count: usize,
    },
    /// Quota is exhausted; nothing was cached or published.
    RateLimited {
        /// Instant at which the quota resets.
        until: DateTime<Utc>,
    },
    /// A newer invocation started first; the result was discarded.
    Stale {
        /// Sequence number of the discarded invocation.
        sequence: u64,
    },
}

/// Failures that void an invocation; previously published state is kept.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    /// The directory search call failed.
    #[error(transparent)]
    Directory(#[from] DirectorySearchError),
    /// At least one profile lookup failed, voiding the whole batch.
    #[error("enrichment batch failed at `{login}`: {source}")]
    Enrichment {
        /// Login whose lookup failed first.
        login: String,
        /// Underlying lookup failure.
        #[source]
        source: ProfileLookupError,
    },
}
