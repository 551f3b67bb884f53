//! Search orchestration: cache, quota breaker, directory search, enrichment
//! fan-out, ranking and publication.
//!
//! Every invocation is tagged with a sequence number when it starts. Only the
//! newest invocation may write the cache or the published list, so a slow
//! response for an outdated query can never replace a fresher one.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::future::try_join_all;
use tokio::sync::{Semaphore, watch};
use tracing::{debug, info, warn};

use crate::domain::ports::{DirectorySearchError, DirectorySearchSource, ProfileSource, QueryCache};
use crate::domain::rate_limit::{RateLimitStatus, RateLimitTracker};
use crate::domain::{DirectoryHit, EnrichedUser, Query, ResultList};

mod outcome;

pub use outcome::{ResultOrigin, SearchError, SearchOutcome};

/// Default cap on concurrent profile lookups; above one upstream page.
pub const DEFAULT_MAX_CONCURRENT_LOOKUPS: usize = 32;

/// Port bundle required by the orchestrator.
pub struct SearchOrchestratorPorts {
    /// Directory search adapter.
    pub directory: Arc<dyn DirectorySearchSource>,
    /// Profile lookup adapter.
    pub profiles: Arc<dyn ProfileSource>,
    /// Result cache adapter.
    pub cache: Arc<dyn QueryCache>,
}

impl SearchOrchestratorPorts {
    /// Build a strongly-typed port bundle.
    pub fn new(
        directory: Arc<dyn DirectorySearchSource>,
        profiles: Arc<dyn ProfileSource>,
        cache: Arc<dyn QueryCache>,
    ) -> Self {
        Self {
            directory,
            profiles,
            cache,
        }
    }
}

/// Domain-owned search pipeline.
pub struct SearchOrchestrator {
    directory: Arc<dyn DirectorySearchSource>,
    profiles: Arc<dyn ProfileSource>,
    cache: Arc<dyn QueryCache>,
    rate_limit: Arc<RateLimitTracker>,
    lookup_permits: Semaphore,
    latest_sequence: Mutex<u64>,
    published: watch::Sender<ResultList>,
    rate_limit_changes: watch::Sender<RateLimitStatus>,
}

impl SearchOrchestrator {
    /// Build an orchestrator with the default lookup concurrency.
    pub fn new(ports: SearchOrchestratorPorts, rate_limit: Arc<RateLimitTracker>) -> Self {
        Self::with_lookup_limit(ports, rate_limit, DEFAULT_MAX_CONCURRENT_LOOKUPS)
    }

    /// Build an orchestrator allowing at most `max_concurrent_lookups`
    /// profile lookups in flight.
    pub fn with_lookup_limit(
        ports: SearchOrchestratorPorts,
        rate_limit: Arc<RateLimitTracker>,
        max_concurrent_lookups: usize,
    ) -> Self {
        let (published, _) = watch::channel(ResultList::empty());
        let (rate_limit_changes, _) = watch::channel(rate_limit.status());
        Self {
            directory: ports.directory,
            profiles: ports.profiles,
            cache: ports.cache,
            rate_limit,
            lookup_permits: Semaphore::new(max_concurrent_lookups.max(1)),
            latest_sequence: Mutex::new(0),
            published,
            rate_limit_changes,
        }
    }

    /// Subscribe to the published result list.
    pub fn subscribe(&self) -> watch::Receiver<ResultList> {
        self.published.subscribe()
    }

    /// Subscribe to rate-limit flag transitions caused by searches.
    ///
    /// The flag also lapses on its own once the reset instant passes; read
    /// [`Self::rate_limit_status`] for the current value.
    pub fn subscribe_rate_limit(&self) -> watch::Receiver<RateLimitStatus> {
        self.rate_limit_changes.subscribe()
    }

    /// The currently published result list.
    pub fn current(&self) -> ResultList {
        self.published.borrow().clone()
    }

    /// The rate-limit flag exposed alongside the published list.
    pub fn rate_limit_status(&self) -> RateLimitStatus {
        self.rate_limit.status()
    }

    /// Shared quota tracker.
    pub fn rate_limit(&self) -> &Arc<RateLimitTracker> {
        &self.rate_limit
    }

    /// Return whether `query` can be answered without network calls.
    pub fn answers_locally(&self, query: &Query) -> bool {
        query.is_empty() || self.cache.lookup(query).is_some()
    }

    /// Run one search invocation for `query`.
    ///
    /// Quota exhaustion is reported as [`SearchOutcome::RateLimited`]. Any
    /// failed call yields an error and leaves the cache and the published
    /// list untouched.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Directory`] when the search call fails and
    /// [`SearchError::Enrichment`] when any profile lookup fails.
    pub async fn search(&self, query: &Query) -> Result<SearchOutcome, SearchError> {
        let sequence = {
            let mut latest = self.lock_sequence();
            *latest += 1;
            let sequence = *latest;

            if let Some(cached) = self.cache.lookup(query) {
                debug!(%query, sequence, "query cache hit");
                return Ok(self.publish(sequence, query, cached, ResultOrigin::Cache));
            }
            if query.is_empty() {
                return Ok(self.publish(sequence, query, ResultList::empty(), ResultOrigin::Empty));
            }
            sequence
        };

        if let RateLimitStatus::Exceeded { until } = self.rate_limit.status() {
            info!(%query, %until, "search skipped while rate limit is in effect");
            return Ok(SearchOutcome::RateLimited { until });
        }

        let hits = match self.directory.search_users(query).await {
            Ok(hits) => hits,
            Err(DirectorySearchError::RateLimited { hint }) => {
                let until = self.rate_limit.mark_exceeded(&hint);
                warn!(%query, %until, %hint, "directory search quota exhausted");
                self.rate_limit_changes
                    .send_replace(RateLimitStatus::Exceeded { until });
                return Ok(SearchOutcome::RateLimited { until });
            }
            Err(error) => {
                warn!(%query, %error, "directory search failed");
                return Err(error.into());
            }
        };

        let hit_count = hits.len();
        let users = self.enrich_all(hits).await.inspect_err(|error| {
            warn!(%query, hit_count, %error, "enrichment batch failed; keeping previous results");
        })?;
        let ranked = ResultList::ranked(users);

        let latest = self.lock_sequence();
        if *latest != sequence {
            debug!(%query, sequence, latest = *latest, "discarding stale search result");
            return Ok(SearchOutcome::Stale { sequence });
        }
        self.cache.store(query.clone(), ranked.clone());
        self.rate_limit.clear();
        self.rate_limit_changes.send_if_modified(|status| {
            let was_exceeded = status.is_exceeded();
            *status = RateLimitStatus::Clear;
            was_exceeded
        });
        Ok(self.publish(sequence, query, ranked, ResultOrigin::Network))
    }

    async fn enrich_all(&self, hits: Vec<DirectoryHit>) -> Result<Vec<EnrichedUser>, SearchError> {
        try_join_all(hits.into_iter().map(|hit| self.enrich(hit))).await
    }

    async fn enrich(&self, hit: DirectoryHit) -> Result<EnrichedUser, SearchError> {
        // The semaphore is never closed, so acquisition only waits.
        let _permit = self.lookup_permits.acquire().await.ok();
        match self.profiles.fetch_profile(&hit.login).await {
            Ok(profile) => Ok(EnrichedUser::new(hit, profile)),
            Err(source) => Err(SearchError::Enrichment {
                login: hit.login,
                source,
            }),
        }
    }

    fn publish(
        &self,
        sequence: u64,
        query: &Query,
        results: ResultList,
        origin: ResultOrigin,
    ) -> SearchOutcome {
        let count = results.len();
        self.published.send_replace(results);
        info!(%query, sequence, count, ?origin, "published search results");
        SearchOutcome::Published {
            sequence,
            origin,
            count,
        }
    }

    fn lock_sequence(&self) -> MutexGuard<'_, u64> {
        self.latest_sequence
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
