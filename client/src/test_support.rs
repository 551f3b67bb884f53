//! Test doubles for the search pipeline.
//!
//! Shared by unit tests (in `src/`) and integration tests (in `tests/`). Only
//! compiled for tests or with the `test-support` feature.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeDelta, Utc};
use mockable::Clock;
use tokio::sync::Notify;

use crate::domain::ports::{
    DirectorySearchError, DirectorySearchSource, ProfileLookupError, ProfileSource,
};
use crate::domain::{DirectoryHit, Query, UserProfile};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(_) => panic!("test double mutex poisoned"),
    }
}

/// Build a hit whose URLs derive from `login`.
pub fn hit(id: u64, login: &str) -> DirectoryHit {
    DirectoryHit {
        id,
        login: login.to_owned(),
        avatar_url: format!("https://avatars.example/u/{id}"),
        html_url: format!("https://github.example/{login}"),
    }
}

/// Build a profile with a display name derived from `followers`.
pub fn profile(name: &str, followers: u64) -> UserProfile {
    UserProfile {
        display_name: Some(name.to_owned()),
        followers,
    }
}

/// Clock whose instant only moves when told to.
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    /// Start the clock at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    /// Move the clock forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        let delta = match TimeDelta::from_std(delta) {
            Ok(delta) => delta,
            Err(error) => {
                panic!("failed to convert Duration to TimeDelta: {error}; delta={delta:?}")
            }
        };
        *lock(&self.0) += delta;
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *lock(&self.0)
    }
}

/// Directory source answering from a per-query script.
///
/// Unscripted queries fail with a transport error. A query may be gated so its
/// response is held back until the returned [`Notify`] is signalled.
#[derive(Default)]
pub struct ScriptedDirectory {
    responses: Mutex<HashMap<String, Result<Vec<DirectoryHit>, DirectorySearchError>>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    calls: Mutex<Vec<Query>>,
}

impl ScriptedDirectory {
    /// Create a directory with no scripted queries.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the response returned for `query`.
    pub fn respond(
        self,
        query: &str,
        response: Result<Vec<DirectoryHit>, DirectorySearchError>,
    ) -> Self {
        lock(&self.responses).insert(query.to_owned(), response);
        self
    }

    /// Hold responses for `query` until the returned handle is notified.
    pub fn gate(&self, query: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        lock(&self.gates).insert(query.to_owned(), gate.clone());
        gate
    }

    /// Queries searched so far, in call order.
    pub fn calls(&self) -> Vec<Query> {
        lock(&self.calls).clone()
    }

    /// Number of searches issued so far.
    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }
}

#[async_trait]
impl DirectorySearchSource for ScriptedDirectory {
    async fn search_users(&self, query: &Query) -> Result<Vec<DirectoryHit>, DirectorySearchError> {
        lock(&self.calls).push(query.clone());
        let gate = lock(&self.gates).get(query.as_str()).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        lock(&self.responses)
            .get(query.as_str())
            .cloned()
            .unwrap_or_else(|| {
                Err(DirectorySearchError::transport(format!(
                    "no scripted response for `{query}`"
                )))
            })
    }
}

/// Profile source answering from a per-login script.
///
/// Unscripted logins fail with `NotFound`.
#[derive(Default)]
pub struct ScriptedProfiles {
    responses: Mutex<HashMap<String, Result<UserProfile, ProfileLookupError>>>,
    calls: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl ScriptedProfiles {
    /// Create a profile source with no scripted logins.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the response returned for `login`.
    pub fn respond(self, login: &str, response: Result<UserProfile, ProfileLookupError>) -> Self {
        lock(&self.responses).insert(login.to_owned(), response);
        self
    }

    /// Number of lookups issued so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of lookups observed in flight at once.
    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProfileSource for ScriptedProfiles {
    async fn fetch_profile(&self, login: &str) -> Result<UserProfile, ProfileLookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let active_now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active_now, Ordering::SeqCst);
        // Let sibling lookups start so fan-out width is observable.
        tokio::task::yield_now().await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        lock(&self.responses)
            .get(login)
            .cloned()
            .unwrap_or_else(|| Err(ProfileLookupError::not_found(login)))
    }
}
