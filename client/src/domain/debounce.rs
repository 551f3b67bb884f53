//! Trailing-edge debounce in front of the search orchestrator.
//!
//! Every query change re-arms a single timer. When the window elapses without
//! another change, the orchestrator runs for the last query as its own task.
//! Re-arming or tearing down aborts the timer only; a run that has already
//! started is never cancelled.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{info, trace, warn};

use crate::domain::rate_limit::RateLimitStatus;
use crate::domain::search::{SearchError, SearchOrchestrator, SearchOutcome};
use crate::domain::Query;

/// Default quiescence window.
pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

type SearchRun = JoinHandle<Result<SearchOutcome, SearchError>>;

/// Result of feeding a query change to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleDecision {
    /// A search for the query fires once the window elapses quietly.
    Scheduled,
    /// The quota breaker is open and the query needs the network.
    Suppressed {
        /// Instant at which the quota resets.
        until: DateTime<Utc>,
    },
}

/// Collapses bursts of query changes into one orchestrator invocation.
pub struct DebounceController {
    orchestrator: Arc<SearchOrchestrator>,
    window: Duration,
    pending: Option<JoinHandle<()>>,
    latest_run: Arc<Mutex<Option<SearchRun>>>,
}

impl DebounceController {
    /// Build a controller that waits `window` after the last change.
    pub fn new(orchestrator: Arc<SearchOrchestrator>, window: Duration) -> Self {
        Self {
            orchestrator,
            window,
            pending: None,
            latest_run: Arc::new(Mutex::new(None)),
        }
    }

    /// Return whether a timer is armed and has not fired yet.
    pub fn has_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|timer| !timer.is_finished())
    }

    /// Record a new query, replacing whatever was scheduled before.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn on_query_change(&mut self, query: Query) -> ScheduleDecision {
        if let Some(previous) = self.pending.take() {
            trace!(%query, "debounce timer re-armed");
            previous.abort();
        }

        if let RateLimitStatus::Exceeded { until } = self.orchestrator.rate_limit_status()
            && !self.orchestrator.answers_locally(&query)
        {
            info!(%query, %until, "search suppressed while rate limit is in effect");
            return ScheduleDecision::Suppressed { until };
        }

        let orchestrator = Arc::clone(&self.orchestrator);
        let latest_run = Arc::clone(&self.latest_run);
        let window = self.window;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;
            let run = tokio::spawn(async move { orchestrator.search(&query).await });
            lock(&latest_run).replace(run);
        }));
        ScheduleDecision::Scheduled
    }

    /// Wait for the armed timer to fire and for the most recently started
    /// run to finish.
    ///
    /// Returns `None` when nothing has run since the last drain or when the
    /// run panicked.
    pub async fn drain(&mut self) -> Option<Result<SearchOutcome, SearchError>> {
        if let Some(timer) = self.pending.take()
            && let Err(error) = timer.await
        {
            warn!(%error, "debounce timer task failed");
        }

        let run = lock(&self.latest_run).take()?;
        match run.await {
            Ok(result) => Some(result),
            Err(error) => {
                warn!(%error, "search task failed");
                None
            }
        }
    }

    /// Cancel the armed timer, if any.
    pub fn shutdown(&mut self) {
        if let Some(timer) = self.pending.take() {
            trace!("pending search cancelled");
            timer.abort();
        }
    }
}

impl Drop for DebounceController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn lock(slot: &Mutex<Option<SearchRun>>) -> MutexGuard<'_, Option<SearchRun>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    //! Debounce behaviour under tokio's paused clock.

    use std::num::NonZeroUsize;

    use chrono::TimeZone;
    use rstest::{fixture, rstest};

    use super::*;
    use crate::domain::ports::{QueryCache, RateLimitHint};
    use crate::domain::search::{ResultOrigin, SearchOrchestratorPorts};
    use crate::domain::{RateLimitTracker, ResultList};
    use crate::outbound::cache::LruQueryCache;
    use crate::test_support::{MutableClock, ScriptedDirectory, ScriptedProfiles, hit, profile};

    struct Harness {
        controller: DebounceController,
        orchestrator: Arc<SearchOrchestrator>,
        directory: Arc<ScriptedDirectory>,
        cache: Arc<LruQueryCache>,
        tracker: Arc<RateLimitTracker>,
    }

    #[fixture]
    fn directory() -> ScriptedDirectory {
        ScriptedDirectory::new()
            .respond("a", Ok(vec![hit(1, "ann")]))
            .respond("ab", Ok(vec![hit(2, "abe")]))
            .respond("abc", Ok(vec![hit(3, "abc")]))
            .respond("x", Ok(vec![hit(4, "xavier")]))
    }

    fn profiles() -> ScriptedProfiles {
        ScriptedProfiles::new()
            .respond("ann", Ok(profile("Ann", 1)))
            .respond("abe", Ok(profile("Abe", 2)))
            .respond("abc", Ok(profile("Abc", 3)))
            .respond("xavier", Ok(profile("Xavier", 4)))
    }

    fn harness(directory: ScriptedDirectory) -> Harness {
        let directory = Arc::new(directory);
        let cache = Arc::new(LruQueryCache::new(
            NonZeroUsize::new(8).expect("non-zero capacity"),
        ));
        let now = Utc
            .with_ymd_and_hms(2026, 3, 14, 9, 30, 0)
            .single()
            .expect("valid time");
        let tracker = Arc::new(RateLimitTracker::new(
            Arc::new(MutableClock::new(now)),
            Duration::from_secs(60),
        ));
        let orchestrator = Arc::new(SearchOrchestrator::new(
            SearchOrchestratorPorts::new(directory.clone(), Arc::new(profiles()), cache.clone()),
            tracker.clone(),
        ));
        Harness {
            controller: DebounceController::new(orchestrator.clone(), DEFAULT_DEBOUNCE_WINDOW),
            orchestrator,
            directory,
            cache,
            tracker,
        }
    }

    fn searched(directory: &ScriptedDirectory) -> Vec<String> {
        directory
            .calls()
            .iter()
            .map(|query| query.as_str().to_owned())
            .collect()
    }

    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn rapid_changes_search_only_the_last_query(directory: ScriptedDirectory) {
        let mut h = harness(directory);

        for query in ["a", "ab", "abc"] {
            assert_eq!(
                h.controller.on_query_change(Query::new(query)),
                ScheduleDecision::Scheduled
            );
            tokio::time::advance(Duration::from_millis(100)).await;
        }
        let outcome = h.controller.drain().await;

        assert_eq!(searched(&h.directory), ["abc"]);
        assert!(matches!(
            outcome,
            Some(Ok(SearchOutcome::Published {
                origin: ResultOrigin::Network,
                count: 1,
                ..
            }))
        ));
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn timer_waits_for_a_quiet_window(directory: ScriptedDirectory) {
        let mut h = harness(directory);

        h.controller.on_query_change(Query::new("a"));
        tokio::time::advance(Duration::from_millis(499)).await;
        settle().await;
        assert_eq!(h.directory.call_count(), 0);
        assert!(h.controller.has_pending());

        tokio::time::advance(Duration::from_millis(1)).await;
        settle().await;
        assert_eq!(searched(&h.directory), ["a"]);
        assert!(!h.controller.has_pending());
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn repeated_identical_query_searches_once(directory: ScriptedDirectory) {
        let mut h = harness(directory);

        h.controller.on_query_change(Query::new("x"));
        tokio::time::advance(Duration::from_millis(200)).await;
        h.controller.on_query_change(Query::new("x"));
        let outcome = h.controller.drain().await;

        assert_eq!(searched(&h.directory), ["x"]);
        assert!(matches!(
            outcome,
            Some(Ok(SearchOutcome::Published { sequence: 1, .. }))
        ));
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn dropping_the_controller_cancels_pending_search(directory: ScriptedDirectory) {
        let h = harness(directory);
        let mut controller = h.controller;

        controller.on_query_change(Query::new("a"));
        drop(controller);
        tokio::time::advance(Duration::from_secs(5)).await;
        settle().await;

        assert_eq!(h.directory.call_count(), 0);
        assert_eq!(h.orchestrator.current(), ResultList::empty());
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn shutdown_leaves_in_flight_search_running(directory: ScriptedDirectory) {
        let mut h = harness(directory);
        let gate = h.directory.gate("a");

        h.controller.on_query_change(Query::new("a"));
        tokio::time::advance(DEFAULT_DEBOUNCE_WINDOW).await;
        settle().await;
        assert_eq!(h.directory.call_count(), 1, "search for `a` is in flight");

        h.controller.on_query_change(Query::new("ab"));
        h.controller.shutdown();
        gate.notify_one();
        let outcome = h.controller.drain().await;

        assert_eq!(searched(&h.directory), ["a"]);
        assert!(matches!(
            outcome,
            Some(Ok(SearchOutcome::Published {
                origin: ResultOrigin::Network,
                ..
            }))
        ));
        assert_eq!(h.orchestrator.current().len(), 1);
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn open_breaker_suppresses_network_queries(directory: ScriptedDirectory) {
        let mut h = harness(directory);
        let until = h
            .tracker
            .mark_exceeded(&RateLimitHint::RetryAfter(Duration::from_secs(30)));

        let decision = h.controller.on_query_change(Query::new("ab"));

        assert_eq!(decision, ScheduleDecision::Suppressed { until });
        assert!(!h.controller.has_pending());
        assert!(h.controller.drain().await.is_none());
        assert_eq!(h.directory.call_count(), 0);
    }

    #[rstest]
    #[case::empty("")]
    #[case::cached("abc")]
    #[tokio::test(start_paused = true)]
    async fn open_breaker_still_answers_locally(
        directory: ScriptedDirectory,
        #[case] query: &str,
    ) {
        let mut h = harness(directory);
        h.cache.store(Query::new("abc"), ResultList::empty());
        h.tracker.mark_exceeded(&RateLimitHint::Unknown);

        let decision = h.controller.on_query_change(Query::new(query));
        let outcome = h.controller.drain().await;

        assert_eq!(decision, ScheduleDecision::Scheduled);
        assert!(matches!(
            outcome,
            Some(Ok(SearchOutcome::Published { count: 0, .. }))
        ));
        assert_eq!(h.directory.call_count(), 0);
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn suppression_discards_the_superseded_timer(directory: ScriptedDirectory) {
        let mut h = harness(directory);

        h.controller.on_query_change(Query::new("a"));
        h.tracker.mark_exceeded(&RateLimitHint::Unknown);
        h.controller.on_query_change(Query::new("ab"));
        tokio::time::advance(Duration::from_secs(1)).await;
        settle().await;

        assert_eq!(h.directory.call_count(), 0);
    }
}
