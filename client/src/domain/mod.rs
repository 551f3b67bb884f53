//! Domain primitives and services for the directory search pipeline.
//!
//! Purpose: own the query lifecycle independently of transport. Adapters plug
//! in through [`ports`]; everything here is driven by injected clocks and
//! sources so it can be exercised deterministically.
//!
//! Public surface:
//! - Query, DirectoryHit, UserProfile, EnrichedUser, ResultList: records
//!   flowing through the pipeline.
//! - RateLimitTracker, RateLimitStatus: shared quota breaker.
//! - SearchOrchestrator: cache, search, enrichment, ranking and publication.
//! - DebounceController: collapses bursts of query changes into one search.

pub mod debounce;
mod directory;
pub mod ports;
pub mod rate_limit;
pub mod search;

pub use self::debounce::{DEFAULT_DEBOUNCE_WINDOW, DebounceController, ScheduleDecision};
pub use self::directory::{DirectoryHit, EnrichedUser, Query, ResultList, UserProfile};
pub use self::rate_limit::{RateLimitStatus, RateLimitTracker};
pub use self::search::{
    ResultOrigin, SearchError, SearchOrchestrator, SearchOrchestratorPorts, SearchOutcome,
};
