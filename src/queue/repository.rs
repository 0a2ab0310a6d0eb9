//! Durable store seam
//!
//! The queue engine treats persistence as an external collaborator behind
//! [`QueueRepository`]. The durable store is the source of truth across actor
//! restarts; the in-memory `QueueStore` is a cache rebuilt from it. Every
//! mutation is written here before it is applied in memory or announced to
//! subscribers (commit-then-publish).

use crate::queue::error::{QueueError, QueueResult};
use crate::queue::types::{QueueEntry, QueueStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

#[async_trait]
pub trait QueueRepository: Send + Sync {
    /// Insert or update one entry row. A returned error means the command
    /// must be rejected with no in-memory change and no event.
    async fn persist_entry(&self, entry: &QueueEntry) -> QueueResult<()>;

    /// All WAITING and IN_PROGRESS rows for a hospital, used to rebuild the
    /// in-memory index on actor startup.
    async fn load_active_entries(&self, hospital_id: Uuid) -> QueueResult<Vec<QueueEntry>>;

    /// Most recent COMPLETED rows for a hospital (newest last), used to seed
    /// the wait-time estimator on actor startup.
    async fn load_recent_completions(
        &self,
        hospital_id: Uuid,
        limit: usize,
        since: DateTime<Utc>,
    ) -> QueueResult<Vec<QueueEntry>>;
}

/// Hash-map backed repository. The default for tests and single-process
/// deployments without an external database.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    rows: RwLock<HashMap<Uuid, QueueEntry>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn rows_for(&self, hospital_id: Uuid) -> QueueResult<Vec<QueueEntry>> {
        let rows = self.rows.read().map_err(|_| QueueError::StoreWriteFailure {
            message: "repository lock poisoned".to_string(),
        })?;
        Ok(rows
            .values()
            .filter(|e| e.hospital_id == hospital_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl QueueRepository for InMemoryRepository {
    async fn persist_entry(&self, entry: &QueueEntry) -> QueueResult<()> {
        let mut rows = self
            .rows
            .write()
            .map_err(|_| QueueError::StoreWriteFailure {
                message: "repository lock poisoned".to_string(),
            })?;
        rows.insert(entry.id, entry.clone());
        Ok(())
    }

    async fn load_active_entries(&self, hospital_id: Uuid) -> QueueResult<Vec<QueueEntry>> {
        Ok(self
            .rows_for(hospital_id)?
            .into_iter()
            .filter(|e| e.status.is_active())
            .collect())
    }

    async fn load_recent_completions(
        &self,
        hospital_id: Uuid,
        limit: usize,
        since: DateTime<Utc>,
    ) -> QueueResult<Vec<QueueEntry>> {
        let mut completions: Vec<QueueEntry> = self
            .rows_for(hospital_id)?
            .into_iter()
            .filter(|e| {
                e.status == QueueStatus::Completed
                    && e.end_time.is_some_and(|end| end >= since)
            })
            .collect();
        completions.sort_by_key(|e| e.end_time);
        if completions.len() > limit {
            completions.drain(..completions.len() - limit);
        }
        Ok(completions)
    }
}
