//! Outbound adapters implementing domain ports.

pub mod cache;
pub mod github;
