//! Public API for the notification system
//!
//! This module provides the complete public API for the notification system.
//! External modules should import from here rather than directly from
//! internal modules.

use std::sync::{Arc, LazyLock};
use tokio::sync::Mutex;

// Core event types and filters
pub use crate::notifications::event::{
    EntryUpdatedEvent, Event, EventFilter, QueueChangedEvent, StatisticsChangedEvent,
};

// Manager and utilities
pub use crate::notifications::error::NotificationError;
pub use crate::notifications::manager::{AsyncNotificationManager, EventReceiver};

// Statistics
pub use crate::notifications::traits::SubscriberStatistics;

/// Global notification service instance
static NOTIFICATION_SERVICE: LazyLock<Arc<Mutex<AsyncNotificationManager>>> = LazyLock::new(|| {
    log::trace!("Initializing notification service");
    Arc::new(Mutex::new(AsyncNotificationManager::new()))
});

/// Access notification service
///
/// Returns a guard on the global notification service used to publish events
/// and manage subscribers. Each call locks the same shared instance.
///
/// # Examples
/// ```no_run
/// # use medqueue::notifications::api::{get_notification_service, EventFilter};
/// # async fn example(hospital_id: uuid::Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let mut manager = get_notification_service().await;
/// let receiver = manager.subscribe(
///     "dashboard-1".to_string(),
///     EventFilter::Hospital(hospital_id),
///     "gateway:ws".to_string(),
/// )?;
/// # Ok(())
/// # }
/// ```
pub async fn get_notification_service() -> tokio::sync::MutexGuard<'static, AsyncNotificationManager>
{
    NOTIFICATION_SERVICE.lock().await
}

/// Get direct Arc reference to the notification service for internal system
/// components.
///
/// Used by the queue manager to hand the fan-out channel to each hospital
/// actor it creates.
pub(crate) fn get_notification_service_arc() -> Arc<Mutex<AsyncNotificationManager>> {
    NOTIFICATION_SERVICE.clone()
}
