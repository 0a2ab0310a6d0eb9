//! Hospital queue engine
//!
//! Maintains per-hospital patient queues ordered by clinical priority and
//! arrival, with durable-store-first mutations, committed read snapshots,
//! wait-time estimation from service history, and event fan-out after every
//! commit.

// Internal modules - all access should go through api module
pub(crate) mod actor;
pub(crate) mod clock;
pub(crate) mod error;
pub(crate) mod estimator;
pub(crate) mod manager;
pub(crate) mod repository;
pub(crate) mod stats;
pub(crate) mod store;
pub(crate) mod types;

// Public API module - the only public interface for the queue system
pub mod api;

#[cfg(test)]
mod tests;
