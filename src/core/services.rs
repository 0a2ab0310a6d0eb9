//! Service Registry Re-exports
//!
//! Re-exports the global service access functions from their domain modules.

pub use crate::notifications::api::get_notification_service;
pub use crate::queue::api::get_queue_service;
