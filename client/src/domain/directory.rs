//! Directory records flowing through the search pipeline.
//!
//! Hits arrive from the directory search endpoint, are enriched with profile
//! data, and are published as a [`ResultList`] ranked by follower count.

use std::fmt;
use std::sync::Arc;

/// Search input used verbatim as the cache key and upstream query.
///
/// Equality is exact string match: no trimming or case folding is applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Query(String);

impl Query {
    /// Wrap raw user input.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the underlying query text.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Return whether the query holds no characters at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for Query {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl From<&str> for Query {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// One raw record returned by the directory search endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryHit {
    /// Stable upstream identifier.
    pub id: u64,
    /// Login handle, used for the follow-up profile lookup.
    pub login: String,
    /// Avatar image URL.
    pub avatar_url: String,
    /// Public profile page URL.
    pub html_url: String,
}

/// Profile details fetched for a single login.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserProfile {
    /// Canonical display name; upstream allows it to be unset.
    pub display_name: Option<String>,
    /// Follower count used for ranking.
    pub followers: u64,
}

/// A directory hit that has been successfully enriched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedUser {
    /// The original search record.
    pub hit: DirectoryHit,
    /// Display name from the profile lookup.
    pub display_name: Option<String>,
    /// Follower count from the profile lookup.
    pub followers: u64,
}

impl EnrichedUser {
    /// Merge a hit with its profile.
    pub fn new(hit: DirectoryHit, profile: UserProfile) -> Self {
        Self {
            hit,
            display_name: profile.display_name,
            followers: profile.followers,
        }
    }

    /// Login handle of the underlying hit.
    pub fn login(&self) -> &str {
        self.hit.login.as_str()
    }
}

/// Published, immutable list of enriched users.
///
/// ## Invariants
/// - Entries are ordered by follower count, highest first.
/// - Entries with equal follower counts keep their upstream order.
///
/// # Examples
/// ```
/// use directory_search::domain::{DirectoryHit, EnrichedUser, ResultList, UserProfile};
///
/// let user = |login: &str, followers| {
///     EnrichedUser::new(
///         DirectoryHit {
///             id: 1,
///             login: login.to_owned(),
///             avatar_url: String::new(),
///             html_url: String::new(),
///         },
///         UserProfile { display_name: None, followers },
///     )
/// };
/// let list = ResultList::ranked(vec![user("adal", 50), user("ada2", 200)]);
/// let logins: Vec<_> = list.iter().map(EnrichedUser::login).collect();
/// assert_eq!(logins, ["ada2", "adal"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultList(Arc<[EnrichedUser]>);

impl ResultList {
    /// An empty list, published for an empty query.
    pub fn empty() -> Self {
        Self(Arc::from(Vec::new()))
    }

    /// Rank users by follower count, descending, with a stable sort.
    pub fn ranked(mut users: Vec<EnrichedUser>) -> Self {
        users.sort_by(|left, right| right.followers.cmp(&left.followers));
        Self(Arc::from(users))
    }

    /// Iterate over the ranked entries.
    pub fn iter(&self) -> std::slice::Iter<'_, EnrichedUser> {
        self.0.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Return whether the list has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for ResultList {
    fn default() -> Self {
        Self::empty()
    }
}

impl<'a> IntoIterator for &'a ResultList {
    type Item = &'a EnrichedUser;
    type IntoIter = std::slice::Iter<'a, EnrichedUser>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
