//! Statistics Aggregator
//!
//! Derives `QueueStatistics` from the current store state. The actor calls
//! [`compute`] after every committed mutation; [`spawn_statistics_refresh`]
//! additionally republishes each hospital's snapshot on a timer, because
//! average wait grows with elapsed time even when no command has run.

use crate::queue::manager::QueueManager;
use crate::queue::types::{QueueEntry, QueuePriority, QueueStatistics, QueueStatus};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

/// Build a statistics snapshot over a hospital's retained entries.
///
/// Only WAITING entries count; `by_priority` always carries all five tiers
/// so `sum(by_priority) == sum(by_specialty) == total_waiting` holds with a
/// stable shape.
pub fn compute<'a>(
    hospital_id: Uuid,
    entries: impl Iterator<Item = &'a QueueEntry>,
    now: DateTime<Utc>,
) -> QueueStatistics {
    let mut by_priority: BTreeMap<QueuePriority, usize> =
        QueuePriority::ALL.iter().map(|p| (*p, 0)).collect();
    let mut by_specialty: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_waiting = 0usize;
    let mut waited_minutes = 0.0f64;

    for entry in entries.filter(|e| e.status == QueueStatus::Waiting) {
        total_waiting += 1;
        *by_priority.entry(entry.priority).or_insert(0) += 1;
        *by_specialty.entry(entry.specialty.clone()).or_insert(0) += 1;
        let waited = now - entry.check_in_time;
        waited_minutes += (waited.num_seconds().max(0)) as f64 / 60.0;
    }

    let average_wait_time = if total_waiting == 0 {
        0.0
    } else {
        waited_minutes / total_waiting as f64
    };

    QueueStatistics {
        hospital_id,
        total_waiting,
        average_wait_time,
        by_priority,
        by_specialty,
        timestamp: now,
    }
}

/// Run the periodic statistics refresh until the task is aborted.
///
/// Each tick republishes `queue.statistics.changed` for every known
/// hospital. A hospital whose serialization domain is busy is skipped for
/// that cycle and retried on the next tick.
pub fn spawn_statistics_refresh(manager: Arc<QueueManager>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(manager.config().stats_refresh_interval());
        // The first tick fires immediately; skip it so startup is quiet.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            for hospital_id in manager.hospital_ids().await {
                if !manager.refresh_statistics(hospital_id).await {
                    log::debug!("statistics refresh skipped for hospital {}", hospital_id);
                }
            }
        }
    })
}
