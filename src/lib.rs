//! Hospital queue engine
//!
//! Per-hospital patient queues ordered by clinical priority and arrival.
//! Mutations serialize through one actor per hospital, commit to a durable
//! store before touching memory, and fan events out to scoped subscribers
//! after every commit. Snapshot reads never wait on in-flight commands.
//!
//! Entry points: [`queue::api::get_queue_service`] for queue commands and
//! queries, [`notifications::api::get_notification_service`] for event
//! subscriptions.

pub mod core;
pub mod notifications;
pub mod queue;
