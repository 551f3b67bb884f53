//! Directory search client library.
//!
//! The crate follows a hexagonal layout: `domain` owns the
//! search-debounce-enrich-cache pipeline and its ports, `outbound` holds the
//! HTTP and cache adapters, and `inbound` drives the pipeline from a terminal.

pub mod config;
pub mod domain;
pub mod inbound;
pub mod outbound;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
