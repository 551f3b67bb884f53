//! GitHub outbound adapters.
//!
//! This module provides a thin HTTP implementation of the
//! `DirectorySearchSource` and `ProfileSource` ports.

mod dto;
mod http_source;

pub use http_source::{GithubEndpoints, GithubHttpSource};
