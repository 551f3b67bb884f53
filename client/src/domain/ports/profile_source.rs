//! Driven port for per-user profile lookups used to enrich search hits.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::UserProfile;

define_port_error! {
    /// Errors surfaced while fetching a user profile.
    pub enum ProfileLookupError {
        /// Credential is missing or was rejected.
        Auth { message: String } =>
            "profile lookup unauthorised: {message}",
        /// The login no longer exists upstream.
        NotFound { login: String } =>
            "profile for `{login}` not found",
        /// Network transport failed, timed out, or returned an unexpected status.
        Transport { message: String } =>
            "profile lookup transport failed: {message}",
        /// The response body could not be decoded.
        Decode { message: String } =>
            "profile response decode failed: {message}",
    }
}

/// Port for fetching a single user's profile.
///
/// Adapters hold the credential; callers only supply the login.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileSource: Send + Sync {
    /// Fetch the display name and follower count for `login`.
    async fn fetch_profile(&self, login: &str) -> Result<UserProfile, ProfileLookupError>;
}
