//! Bulk cleanup engine for a user's own messages and reactions.
//!
//! The engine is transport-agnostic. The remote messaging platform lives behind
//! the [`client::MessagingClient`] port, implemented in adapter crates.

pub mod audit;
pub mod chunk;
pub mod client;
pub mod config;
pub mod deletion;
pub mod domain;
pub mod errors;
pub mod guard;
pub mod locator;
pub mod logging;
pub mod orchestrator;
pub mod scrubber;

#[cfg(test)]
pub(crate) mod testing;

pub use errors::{Error, Result};
