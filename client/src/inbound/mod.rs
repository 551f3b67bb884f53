//! Inbound adapters that feed user input into the debounce controller and
//! present published results.
//!
//! The terminal driver in [`terminal`] is the only front end today.

pub mod terminal;
