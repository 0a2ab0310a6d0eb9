//! Shared fixtures for the queue engine tests.

use crate::core::config::QueueConfig;
use crate::notifications::manager::AsyncNotificationManager;
use crate::queue::error::{QueueError, QueueResult};
use crate::queue::manager::QueueManager;
use crate::queue::repository::{InMemoryRepository, QueueRepository};
use crate::queue::types::{CheckInRequest, QueueEntry, QueuePriority};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// A manager wired to its own notification channel and repository, so tests
/// never touch the process-wide services.
pub struct TestHarness {
    pub manager: Arc<QueueManager>,
    pub notifications: Arc<Mutex<AsyncNotificationManager>>,
    pub repository: Arc<InMemoryRepository>,
}

pub fn harness() -> TestHarness {
    harness_with_config(QueueConfig::default())
}

pub fn harness_with_config(config: QueueConfig) -> TestHarness {
    let repository = Arc::new(InMemoryRepository::new());
    let notifications = Arc::new(Mutex::new(AsyncNotificationManager::new()));
    let manager = Arc::new(QueueManager::with_notifications(
        repository.clone(),
        config,
        notifications.clone(),
    ));
    TestHarness {
        manager,
        notifications,
        repository,
    }
}

pub fn request(hospital_id: Uuid, priority: QueuePriority, specialty: &str) -> CheckInRequest {
    CheckInRequest {
        hospital_id,
        patient_id: Uuid::new_v4(),
        priority,
        specialty: specialty.to_string(),
        symptoms: "test symptoms".to_string(),
    }
}

/// Repository whose writes can be switched to fail, for verifying that a
/// rejected durable write leaves no trace in memory or on the wire.
pub struct FailingRepository {
    inner: InMemoryRepository,
    failing: AtomicBool,
}

impl FailingRepository {
    pub fn new() -> Self {
        Self {
            inner: InMemoryRepository::new(),
            failing: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl QueueRepository for FailingRepository {
    async fn persist_entry(&self, entry: &QueueEntry) -> QueueResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(QueueError::StoreWriteFailure {
                message: "injected write failure".to_string(),
            });
        }
        self.inner.persist_entry(entry).await
    }

    async fn load_active_entries(&self, hospital_id: Uuid) -> QueueResult<Vec<QueueEntry>> {
        self.inner.load_active_entries(hospital_id).await
    }

    async fn load_recent_completions(
        &self,
        hospital_id: Uuid,
        limit: usize,
        since: DateTime<Utc>,
    ) -> QueueResult<Vec<QueueEntry>> {
        self.inner
            .load_recent_completions(hospital_id, limit, since)
            .await
    }
}

/// Repository that stalls writes for one hospital until released, for
/// holding a serialization domain open mid-command.
pub struct StallingRepository {
    inner: InMemoryRepository,
    gate: tokio::sync::Semaphore,
    stalled_hospital: Uuid,
}

impl StallingRepository {
    /// Writes for `stalled_hospital` consume a permit each, starting with
    /// `permits` available; other hospitals' writes pass straight through.
    pub fn new(stalled_hospital: Uuid, permits: usize) -> Self {
        Self {
            inner: InMemoryRepository::new(),
            gate: tokio::sync::Semaphore::new(permits),
            stalled_hospital,
        }
    }

    pub fn release(&self, permits: usize) {
        self.gate.add_permits(permits);
    }
}

#[async_trait]
impl QueueRepository for StallingRepository {
    async fn persist_entry(&self, entry: &QueueEntry) -> QueueResult<()> {
        if entry.hospital_id == self.stalled_hospital {
            let permit =
                self.gate
                    .acquire()
                    .await
                    .map_err(|_| QueueError::StoreWriteFailure {
                        message: "write gate closed".to_string(),
                    })?;
            permit.forget();
        }
        self.inner.persist_entry(entry).await
    }

    async fn load_active_entries(&self, hospital_id: Uuid) -> QueueResult<Vec<QueueEntry>> {
        self.inner.load_active_entries(hospital_id).await
    }

    async fn load_recent_completions(
        &self,
        hospital_id: Uuid,
        limit: usize,
        since: DateTime<Utc>,
    ) -> QueueResult<Vec<QueueEntry>> {
        self.inner
            .load_recent_completions(hospital_id, limit, since)
            .await
    }
}

/// Repository whose startup load stalls for one hospital, for holding that
/// hospital's first-use rebuild open mid-flight.
pub struct StallingRebuildRepository {
    inner: InMemoryRepository,
    gate: tokio::sync::Semaphore,
    stalled_hospital: Uuid,
}

impl StallingRebuildRepository {
    pub fn new(stalled_hospital: Uuid) -> Self {
        Self {
            inner: InMemoryRepository::new(),
            gate: tokio::sync::Semaphore::new(0),
            stalled_hospital,
        }
    }

    pub fn release(&self, permits: usize) {
        self.gate.add_permits(permits);
    }
}

#[async_trait]
impl QueueRepository for StallingRebuildRepository {
    async fn persist_entry(&self, entry: &QueueEntry) -> QueueResult<()> {
        self.inner.persist_entry(entry).await
    }

    async fn load_active_entries(&self, hospital_id: Uuid) -> QueueResult<Vec<QueueEntry>> {
        if hospital_id == self.stalled_hospital {
            let permit =
                self.gate
                    .acquire()
                    .await
                    .map_err(|_| QueueError::StoreWriteFailure {
                        message: "load gate closed".to_string(),
                    })?;
            permit.forget();
        }
        self.inner.load_active_entries(hospital_id).await
    }

    async fn load_recent_completions(
        &self,
        hospital_id: Uuid,
        limit: usize,
        since: DateTime<Utc>,
    ) -> QueueResult<Vec<QueueEntry>> {
        self.inner
            .load_recent_completions(hospital_id, limit, since)
            .await
    }
}
