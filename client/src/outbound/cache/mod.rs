//! In-memory LRU adapter for the `QueryCache` port.
//!
//! Entries are evicted least-recently-used first once `capacity` is reached.
//! Lookups refresh recency. A single mutex serialises reads and writes, so a
//! lookup never observes a half-written entry.

use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};

use lru::LruCache;
use tracing::trace;

use crate::domain::ports::QueryCache;
use crate::domain::{Query, ResultList};

/// Default number of cached queries.
pub const DEFAULT_CACHE_CAPACITY: NonZeroUsize = match NonZeroUsize::new(256) {
    Some(capacity) => capacity,
    None => NonZeroUsize::MIN,
};

/// Bounded query cache for one client session.
pub struct LruQueryCache {
    entries: Mutex<LruCache<Query, ResultList>>,
}

impl LruQueryCache {
    /// Create a cache holding at most `capacity` queries.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Number of cached queries.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Return whether nothing is cached yet.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<Query, ResultList>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for LruQueryCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl QueryCache for LruQueryCache {
    fn lookup(&self, query: &Query) -> Option<ResultList> {
        self.lock().get(query).cloned()
    }

    fn store(&self, query: Query, results: ResultList) {
        let mut entries = self.lock();
        if entries.contains(&query) {
            entries.put(query, results);
        } else if let Some((evicted, _)) = entries.push(query, results) {
            trace!(query = %evicted, "evicted least recently used query");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DirectoryHit, EnrichedUser, UserProfile};
    use rstest::rstest;

    fn list(login: &str, followers: u64) -> ResultList {
        ResultList::ranked(vec![EnrichedUser::new(
            DirectoryHit {
                id: followers,
                login: login.to_owned(),
                avatar_url: String::new(),
                html_url: String::new(),
            },
            UserProfile {
                display_name: None,
                followers,
            },
        )])
    }

    fn cache(capacity: usize) -> LruQueryCache {
        LruQueryCache::new(NonZeroUsize::new(capacity).expect("non-zero capacity"))
    }

    #[rstest]
    fn lookup_misses_unknown_query() {
        assert!(cache(2).lookup(&Query::new("ada")).is_none());
    }

    #[rstest]
    fn store_overwrites_existing_entry() {
        let cache = cache(2);
        cache.store(Query::new("ada"), list("adal", 1));
        cache.store(Query::new("ada"), list("ada2", 2));

        assert_eq!(cache.lookup(&Query::new("ada")), Some(list("ada2", 2)));
        assert_eq!(cache.len(), 1);
    }

    #[rstest]
    fn keys_match_exactly() {
        let cache = cache(2);
        cache.store(Query::new("ada"), list("adal", 1));

        assert!(cache.lookup(&Query::new("Ada")).is_none());
        assert!(cache.lookup(&Query::new(" ada")).is_none());
    }

    #[rstest]
    fn least_recently_used_entry_is_evicted() {
        let cache = cache(2);
        cache.store(Query::new("a"), list("a", 1));
        cache.store(Query::new("b"), list("b", 2));
        // Touch "a" so "b" becomes the eviction candidate.
        assert!(cache.lookup(&Query::new("a")).is_some());

        cache.store(Query::new("c"), list("c", 3));

        assert!(cache.lookup(&Query::new("a")).is_some());
        assert!(cache.lookup(&Query::new("b")).is_none(), "b was least recent");
        assert!(cache.lookup(&Query::new("c")).is_some());
        assert_eq!(cache.len(), 2);
    }

    #[rstest]
    fn default_capacity_is_bounded() {
        let cache = LruQueryCache::default();
        assert!(cache.is_empty());
        for index in 0..300 {
            cache.store(Query::new(format!("q{index}")), ResultList::empty());
        }
        assert_eq!(cache.len(), DEFAULT_CACHE_CAPACITY.get());
    }
}
