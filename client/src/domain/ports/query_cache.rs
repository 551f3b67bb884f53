//! Port interface for caching ranked result lists by query.

use crate::domain::{Query, ResultList};

/// Cache of previously computed result lists.
///
/// Implementations serialise access internally, so a lookup never observes a
/// partially written entry.
#[cfg_attr(test, mockall::automock)]
pub trait QueryCache: Send + Sync {
    /// Return the cached list for exactly this query.
    fn lookup(&self, query: &Query) -> Option<ResultList>;

    /// Insert or overwrite the list stored under `query`.
    fn store(&self, query: Query, results: ResultList);
}
