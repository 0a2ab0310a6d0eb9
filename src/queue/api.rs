//! Public API for the queue engine
//!
//! This module provides the complete public API for the queue system.
//! External modules should import from here rather than directly from
//! internal modules.

use crate::core::config::QueueConfig;
use std::sync::{Arc, LazyLock};

// Core queue types
pub use crate::queue::types::{
    CheckInRequest, QueueEntry, QueuePriority, QueueStatistics, QueueStatus,
};

// Errors
pub use crate::queue::error::{QueueError, QueueResult};

// Manager and persistence seam
pub use crate::queue::manager::QueueManager;
pub use crate::queue::repository::{InMemoryRepository, QueueRepository};

// Background statistics refresh
pub use crate::queue::stats::spawn_statistics_refresh;

/// Global queue service instance backed by the in-memory repository and
/// default configuration. Hosting services that bring their own repository
/// or config construct a [`QueueManager`] directly instead.
static QUEUE_SERVICE: LazyLock<Arc<QueueManager>> = LazyLock::new(|| {
    log::trace!("Initializing queue service");
    Arc::new(QueueManager::new(
        Arc::new(InMemoryRepository::new()),
        QueueConfig::default(),
    ))
});

/// Access the global queue service.
///
/// # Examples
/// ```no_run
/// # use medqueue::queue::api::{get_queue_service, CheckInRequest, QueuePriority};
/// # async fn example(hospital_id: uuid::Uuid, patient_id: uuid::Uuid)
/// #     -> Result<(), Box<dyn std::error::Error>> {
/// let queue = get_queue_service();
/// let entry = queue
///     .check_in(CheckInRequest {
///         hospital_id,
///         patient_id,
///         priority: QueuePriority::Urgent,
///         specialty: "cardiology".to_string(),
///         symptoms: "chest pain".to_string(),
///     })
///     .await?;
/// println!("queued at position {:?}", entry.position);
/// # Ok(())
/// # }
/// ```
pub fn get_queue_service() -> Arc<QueueManager> {
    QUEUE_SERVICE.clone()
}
