//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod directory_search_source;
mod profile_source;
mod query_cache;

#[cfg(test)]
pub use directory_search_source::MockDirectorySearchSource;
pub use directory_search_source::{
    DirectorySearchError, DirectorySearchSource, FixtureDirectorySearchSource, RateLimitHint,
};
#[cfg(test)]
pub use profile_source::MockProfileSource;
pub use profile_source::{ProfileLookupError, ProfileSource};
#[cfg(test)]
pub use query_cache::MockQueryCache;
pub use query_cache::QueryCache;
