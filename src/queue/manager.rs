//! Queue manager - routing commands into per-hospital serialization domains
//!
//! The manager owns one `QueueActor` per hospital, created lazily on first
//! use and rebuilt from the durable store at that moment. Commands for the
//! same hospital serialize on the actor's mutex; commands for different
//! hospitals run concurrently. A command that cannot enter its domain within
//! the configured timeout fails with `ActorBusyTimeout` instead of queueing
//! forever; the timeout covers the whole entry path, first-use rebuild
//! included.
//!
//! The hospital map's lock is only ever held for the map operation itself,
//! never across a rebuild: each handle carries its actor in a `OnceCell`
//! that initializes on first use, so a slow rebuild stalls only its own
//! hospital.
//!
//! Reads never enter the serialization domain: each hospital publishes a
//! committed snapshot behind a plain `RwLock` that readers consult directly.

use crate::core::config::QueueConfig;
use crate::notifications::api::get_notification_service_arc;
use crate::notifications::manager::AsyncNotificationManager;
use crate::queue::actor::{CommittedSnapshot, QueueActor};
use crate::queue::error::{QueueError, QueueResult};
use crate::queue::repository::QueueRepository;
use crate::queue::types::{CheckInRequest, QueueEntry, QueuePriority, QueueStatistics};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, OnceCell, OwnedMutexGuard, RwLock};
use uuid::Uuid;

/// One hospital's serialization domain plus its lock-free read surface.
/// The actor cell is empty until the first command or query rebuilds it
/// from the durable store; a failed rebuild leaves the cell empty so the
/// next caller retries.
#[derive(Clone)]
struct HospitalHandle {
    actor: Arc<OnceCell<Arc<Mutex<QueueActor>>>>,
    snapshot: Arc<std::sync::RwLock<CommittedSnapshot>>,
}

pub struct QueueManager {
    hospitals: RwLock<HashMap<Uuid, HospitalHandle>>,
    repository: Arc<dyn QueueRepository>,
    notifications: Arc<Mutex<AsyncNotificationManager>>,
    config: QueueConfig,
}

impl QueueManager {
    /// Manager wired to the global notification service.
    pub fn new(repository: Arc<dyn QueueRepository>, config: QueueConfig) -> Self {
        Self::with_notifications(repository, config, get_notification_service_arc())
    }

    /// Manager with an explicit notification channel. Tests use this to keep
    /// their subscribers off the process-wide service.
    pub fn with_notifications(
        repository: Arc<dyn QueueRepository>,
        config: QueueConfig,
        notifications: Arc<Mutex<AsyncNotificationManager>>,
    ) -> Self {
        Self {
            hospitals: RwLock::new(HashMap::new()),
            repository,
            notifications,
            config,
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Hospitals with an instantiated actor.
    pub async fn hospital_ids(&self) -> Vec<Uuid> {
        self.hospitals.read().await.keys().copied().collect()
    }

    // ---- commands ---------------------------------------------------------

    pub async fn check_in(&self, request: CheckInRequest) -> QueueResult<QueueEntry> {
        let hospital_id = request.hospital_id;
        let mut actor = self.lock_actor(hospital_id).await?;
        actor.check_in(request).await
    }

    pub async fn call_next(
        &self,
        hospital_id: Uuid,
        doctor_id: Uuid,
        specialty: Option<&str>,
    ) -> QueueResult<QueueEntry> {
        let mut actor = self.lock_actor(hospital_id).await?;
        actor.call_next(doctor_id, specialty).await
    }

    pub async fn complete(
        &self,
        hospital_id: Uuid,
        entry_id: Uuid,
        notes: Option<String>,
    ) -> QueueResult<QueueEntry> {
        let mut actor = self.lock_actor(hospital_id).await?;
        actor.complete(entry_id, notes).await
    }

    pub async fn cancel(
        &self,
        hospital_id: Uuid,
        entry_id: Uuid,
        reason: Option<String>,
    ) -> QueueResult<QueueEntry> {
        let mut actor = self.lock_actor(hospital_id).await?;
        actor.cancel(entry_id, reason).await
    }

    pub async fn mark_no_show(&self, hospital_id: Uuid, entry_id: Uuid) -> QueueResult<QueueEntry> {
        let mut actor = self.lock_actor(hospital_id).await?;
        actor.mark_no_show(entry_id).await
    }

    pub async fn reprioritize(
        &self,
        hospital_id: Uuid,
        entry_id: Uuid,
        new_priority: QueuePriority,
    ) -> QueueResult<QueueEntry> {
        let mut actor = self.lock_actor(hospital_id).await?;
        actor.reprioritize(entry_id, new_priority).await
    }

    // ---- queries ----------------------------------------------------------

    /// Authoritative lookup of a single entry, any status.
    pub async fn entry(&self, hospital_id: Uuid, entry_id: Uuid) -> QueueResult<QueueEntry> {
        let actor = self.lock_actor(hospital_id).await?;
        actor.entry(entry_id)
    }

    /// Latest committed statistics snapshot. Does not enter the
    /// serialization domain.
    pub async fn statistics(&self, hospital_id: Uuid) -> QueueResult<QueueStatistics> {
        Ok(self.committed(hospital_id).await?.statistics)
    }

    /// Latest committed WAITING list in queue order. Does not enter the
    /// serialization domain.
    pub async fn waiting_entries(&self, hospital_id: Uuid) -> QueueResult<Vec<QueueEntry>> {
        Ok(self.committed(hospital_id).await?.waiting)
    }

    /// Head of the committed WAITING list, optionally within a specialty.
    pub async fn peek_next(
        &self,
        hospital_id: Uuid,
        specialty: Option<&str>,
    ) -> QueueResult<Option<QueueEntry>> {
        let waiting = self.waiting_entries(hospital_id).await?;
        Ok(waiting
            .into_iter()
            .find(|e| specialty.is_none_or(|s| e.specialty == s)))
    }

    /// Recompute and republish one hospital's statistics. Used by the
    /// background refresh. Returns whether a refresh actually ran: a
    /// hospital that is unknown, still rebuilding, or mid-command is
    /// skipped rather than waited on, and retried on the next tick.
    pub async fn refresh_statistics(&self, hospital_id: Uuid) -> bool {
        let handle = match self.hospitals.read().await.get(&hospital_id) {
            Some(handle) => handle.clone(),
            None => return false,
        };
        let Some(actor) = handle.actor.get() else {
            return false;
        };
        let refreshed = match actor.try_lock() {
            Ok(mut actor) => {
                actor.refresh_statistics().await;
                true
            }
            Err(_) => false,
        };
        refreshed
    }

    // ---- internals --------------------------------------------------------

    /// Enter a hospital's serialization domain, failing after the configured
    /// timeout instead of queueing indefinitely. The timeout spans first-use
    /// rebuild and mutex acquisition together.
    async fn lock_actor(&self, hospital_id: Uuid) -> QueueResult<OwnedMutexGuard<QueueActor>> {
        let handle = self.handle(hospital_id).await;
        let started = Instant::now();

        let entered = tokio::time::timeout(self.config.command_timeout(), async {
            let actor = self.init_actor(hospital_id, &handle).await?;
            Ok::<_, QueueError>(actor.lock_owned().await)
        })
        .await;

        match entered {
            Ok(result) => result,
            Err(_) => Err(QueueError::ActorBusyTimeout {
                hospital_id,
                waited_ms: started.elapsed().as_millis() as u64,
            }),
        }
    }

    /// Latest committed snapshot, initializing the hospital's actor first so
    /// a fresh manager serves rebuilt state rather than an empty queue. The
    /// rebuild wait is bounded like any other domain entry.
    async fn committed(&self, hospital_id: Uuid) -> QueueResult<CommittedSnapshot> {
        let handle = self.handle(hospital_id).await;
        let started = Instant::now();

        match tokio::time::timeout(
            self.config.command_timeout(),
            self.init_actor(hospital_id, &handle),
        )
        .await
        {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                return Err(QueueError::ActorBusyTimeout {
                    hospital_id,
                    waited_ms: started.elapsed().as_millis() as u64,
                })
            }
        }

        let snapshot = handle
            .snapshot
            .read()
            .map_err(|_| QueueError::StoreWriteFailure {
                message: "snapshot lock poisoned".to_string(),
            })?;
        Ok(snapshot.clone())
    }

    /// Get or create a hospital's handle. The map lock is held only for the
    /// lookup or insert itself; the actor inside stays uninitialized.
    async fn handle(&self, hospital_id: Uuid) -> HospitalHandle {
        if let Some(handle) = self.hospitals.read().await.get(&hospital_id) {
            return handle.clone();
        }

        let mut hospitals = self.hospitals.write().await;
        hospitals
            .entry(hospital_id)
            .or_insert_with(|| HospitalHandle {
                actor: Arc::new(OnceCell::new()),
                snapshot: Arc::new(std::sync::RwLock::new(CommittedSnapshot::empty(
                    hospital_id,
                ))),
            })
            .clone()
    }

    /// Rebuild the hospital's actor on first use. Concurrent callers for the
    /// same hospital wait on the cell; other hospitals are unaffected. On
    /// failure the cell stays empty and the next caller retries the rebuild.
    async fn init_actor(
        &self,
        hospital_id: Uuid,
        handle: &HospitalHandle,
    ) -> QueueResult<Arc<Mutex<QueueActor>>> {
        let actor = handle
            .actor
            .get_or_try_init(|| async {
                let actor = QueueActor::rebuild(
                    hospital_id,
                    self.repository.clone(),
                    self.notifications.clone(),
                    &self.config,
                    handle.snapshot.clone(),
                )
                .await?;
                Ok::<_, QueueError>(Arc::new(Mutex::new(actor)))
            })
            .await?;
        Ok(actor.clone())
    }
}
