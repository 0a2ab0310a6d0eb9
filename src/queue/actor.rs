//! Queue Actor - per-hospital command processor
//!
//! One `QueueActor` owns one hospital's queue state. The manager wraps each
//! actor in a `tokio::sync::Mutex`, so every command for a hospital runs
//! strictly one at a time while different hospitals proceed in parallel.
//!
//! Every command follows commit-then-publish: the durable write happens
//! first, the in-memory index is only touched after the write succeeds, and
//! events go out last. A failed write therefore leaves cache, store of
//! record, and subscribers all agreeing on the pre-command state.

use crate::core::config::QueueConfig;
use crate::core::error_handling::log_error_with_context;
use crate::notifications::api::{
    EntryUpdatedEvent, Event, QueueChangedEvent, StatisticsChangedEvent,
};
use crate::notifications::manager::AsyncNotificationManager;
use crate::queue::clock::PriorityClock;
use crate::queue::error::{QueueError, QueueResult};
use crate::queue::estimator::WaitTimeEstimator;
use crate::queue::repository::QueueRepository;
use crate::queue::stats;
use crate::queue::store::QueueStore;
use crate::queue::types::{
    CheckInRequest, QueueEntry, QueuePriority, QueueStatistics, QueueStatus,
};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use uuid::Uuid;

/// Latest committed state, readable without entering the serialization
/// domain. Readers see at most one in-flight command's worth of staleness.
#[derive(Debug, Clone)]
pub struct CommittedSnapshot {
    pub waiting: Vec<QueueEntry>,
    pub statistics: QueueStatistics,
}

impl CommittedSnapshot {
    pub(crate) fn empty(hospital_id: Uuid) -> Self {
        Self {
            waiting: Vec::new(),
            statistics: stats::compute(hospital_id, std::iter::empty(), Utc::now()),
        }
    }
}

pub struct QueueActor {
    hospital_id: Uuid,
    store: QueueStore,
    clock: PriorityClock,
    estimator: WaitTimeEstimator,
    repository: Arc<dyn QueueRepository>,
    notifications: Arc<Mutex<AsyncNotificationManager>>,
    snapshot: Arc<RwLock<CommittedSnapshot>>,
}

impl QueueActor {
    /// Rebuild a hospital's actor from the durable store: active rows
    /// repopulate the ordered index, recent completions seed the estimator,
    /// and the sequence counter resumes past anything already issued.
    /// No events are published; rebuild is not a mutation.
    pub(crate) async fn rebuild(
        hospital_id: Uuid,
        repository: Arc<dyn QueueRepository>,
        notifications: Arc<Mutex<AsyncNotificationManager>>,
        config: &QueueConfig,
        snapshot: Arc<RwLock<CommittedSnapshot>>,
    ) -> QueueResult<Self> {
        let mut store = QueueStore::new(hospital_id);
        let clock = PriorityClock::new();
        let mut estimator = WaitTimeEstimator::from_config(config);

        let active = repository.load_active_entries(hospital_id).await?;
        let restored = active.len();
        let mut highest_sequence = 0u64;
        for entry in active {
            highest_sequence = highest_sequence.max(entry.sequence);
            store.apply(entry);
        }
        clock.resume_after(highest_sequence);

        let since = Utc::now() - chrono::Duration::days(config.service_window_days);
        let completions = repository
            .load_recent_completions(hospital_id, config.service_window_completions, since)
            .await?;
        for completion in &completions {
            if let (Some(start), Some(end)) = (completion.start_time, completion.end_time) {
                estimator.record_completion(&completion.specialty, start, end);
            }
        }

        log::info!(
            "rebuilt queue for hospital {}: {} active entries, {} completion samples",
            hospital_id,
            restored,
            completions.len()
        );

        let mut actor = Self {
            hospital_id,
            store,
            clock,
            estimator,
            repository,
            notifications,
            snapshot,
        };
        actor.refresh_derived();
        actor.commit_snapshot();
        Ok(actor)
    }

    /// Check a patient in: creates a WAITING entry, positioned by priority
    /// then arrival.
    pub async fn check_in(&mut self, request: CheckInRequest) -> QueueResult<QueueEntry> {
        if self.store.has_active_patient(request.patient_id) {
            return Err(QueueError::DuplicateActiveEntry {
                hospital_id: self.hospital_id,
                patient_id: request.patient_id,
            });
        }

        let entry = QueueEntry::new(request, Utc::now(), self.clock.next_sequence());
        self.persist(&entry, "check-in durable write").await?;
        self.store.insert(entry.clone())?;
        self.refresh_derived();

        let committed = self.store.entry_cloned(entry.id)?;
        log::debug!(
            "check-in: patient {} at hospital {} position {:?} ({} waiting)",
            committed.patient_id,
            self.hospital_id,
            committed.position,
            self.store.waiting_count()
        );
        self.commit_and_publish(committed.clone()).await;
        Ok(committed)
    }

    /// Advance the top-ranked WAITING entry (optionally within a specialty)
    /// to IN_PROGRESS and assign the calling doctor. Irreversible: there is
    /// no un-call.
    pub async fn call_next(
        &mut self,
        doctor_id: Uuid,
        specialty: Option<&str>,
    ) -> QueueResult<QueueEntry> {
        let next = self
            .store
            .peek_next(specialty)
            .cloned()
            .ok_or_else(|| QueueError::QueueEmpty {
                hospital_id: self.hospital_id,
                specialty: specialty.map(str::to_string),
            })?;

        let mut updated = next;
        updated.status = QueueStatus::InProgress;
        updated.start_time = Some(Utc::now());
        updated.doctor_id = Some(doctor_id);
        updated.position = None;
        updated.estimated_wait_time = None;

        self.persist(&updated, "call-next durable write").await?;
        self.store.apply(updated.clone());
        self.refresh_derived();

        log::debug!(
            "call-next: entry {} -> doctor {} at hospital {}",
            updated.id,
            doctor_id,
            self.hospital_id
        );
        self.commit_and_publish(updated.clone()).await;
        Ok(updated)
    }

    /// Finish an IN_PROGRESS consultation and feed its duration into the
    /// wait-time estimator.
    pub async fn complete(
        &mut self,
        entry_id: Uuid,
        notes: Option<String>,
    ) -> QueueResult<QueueEntry> {
        let current = self.store.entry_cloned(entry_id)?;
        if current.status != QueueStatus::InProgress {
            return Err(QueueError::InvalidTransition {
                entry_id,
                from: current.status,
                action: "complete",
            });
        }

        let mut updated = current;
        updated.status = QueueStatus::Completed;
        updated.end_time = Some(Utc::now());
        if notes.is_some() {
            updated.notes = notes;
        }

        self.persist(&updated, "completion durable write").await?;
        self.store.apply(updated.clone());
        if let (Some(start), Some(end)) = (updated.start_time, updated.end_time) {
            self.estimator
                .record_completion(&updated.specialty, start, end);
        }
        self.refresh_derived();

        self.commit_and_publish(updated.clone()).await;
        Ok(updated)
    }

    /// Cancel an active entry. Allowed from WAITING and from IN_PROGRESS; a
    /// patient may leave mid-consultation.
    pub async fn cancel(
        &mut self,
        entry_id: Uuid,
        reason: Option<String>,
    ) -> QueueResult<QueueEntry> {
        let current = self.store.entry_cloned(entry_id)?;
        if !current.status.is_active() {
            return Err(QueueError::InvalidTransition {
                entry_id,
                from: current.status,
                action: "cancel",
            });
        }

        let mut updated = current;
        updated.status = QueueStatus::Cancelled;
        updated.cancel_reason = reason;
        updated.position = None;
        updated.estimated_wait_time = None;

        self.persist(&updated, "cancellation durable write").await?;
        self.store.apply(updated.clone());
        self.refresh_derived();

        self.commit_and_publish(updated.clone()).await;
        Ok(updated)
    }

    /// Mark a WAITING entry as a no-show. Only meaningful while the patient
    /// has not yet been called.
    pub async fn mark_no_show(&mut self, entry_id: Uuid) -> QueueResult<QueueEntry> {
        let current = self.store.entry_cloned(entry_id)?;
        if current.status != QueueStatus::Waiting {
            return Err(QueueError::InvalidTransition {
                entry_id,
                from: current.status,
                action: "mark as no-show",
            });
        }

        let mut updated = current;
        updated.status = QueueStatus::NoShow;
        updated.position = None;
        updated.estimated_wait_time = None;

        self.persist(&updated, "no-show durable write").await?;
        self.store.apply(updated.clone());
        self.refresh_derived();

        self.commit_and_publish(updated.clone()).await;
        Ok(updated)
    }

    /// Change a WAITING entry's priority and re-rank the queue. The entry
    /// keeps its arrival time and sequence, so it queues fairly within its
    /// new tier.
    pub async fn reprioritize(
        &mut self,
        entry_id: Uuid,
        new_priority: QueuePriority,
    ) -> QueueResult<QueueEntry> {
        let current = self.store.entry_cloned(entry_id)?;
        if current.status != QueueStatus::Waiting {
            return Err(QueueError::InvalidTransition {
                entry_id,
                from: current.status,
                action: "reprioritize",
            });
        }

        let mut updated = current;
        updated.priority = new_priority;

        self.persist(&updated, "reprioritize durable write").await?;
        self.store.apply(updated.clone());
        self.refresh_derived();

        let committed = self.store.entry_cloned(entry_id)?;
        self.commit_and_publish(committed.clone()).await;
        Ok(committed)
    }

    /// Authoritative entry lookup, served from inside the serialization
    /// domain.
    pub fn entry(&self, entry_id: Uuid) -> QueueResult<QueueEntry> {
        self.store.entry_cloned(entry_id)
    }

    /// Recompute and republish statistics without any store mutation. Used
    /// by the periodic refresh timer: average wait grows as time passes.
    pub async fn refresh_statistics(&mut self) {
        let statistics = self.commit_snapshot().1;
        self.publish(vec![Event::StatisticsChanged(StatisticsChangedEvent::new(
            statistics,
        ))])
        .await;
    }

    /// Write one entry to the store of record. Failures are logged here and
    /// abort the command before any in-memory change.
    async fn persist(&self, entry: &QueueEntry, context: &str) -> QueueResult<()> {
        if let Err(e) = self.repository.persist_entry(entry).await {
            log_error_with_context(&e, context);
            return Err(e);
        }
        Ok(())
    }

    /// Recompute positions for all WAITING entries, then refresh every
    /// waiting entry's estimate against its current ahead-of count. Eager by
    /// design: an estimate must reflect the entry's current position, never
    /// a stale one.
    fn refresh_derived(&mut self) {
        self.store.reorder();

        let now = Utc::now();
        let ordered = self.store.waiting_ids();
        let mut ahead_in_specialty: HashMap<String, usize> = HashMap::new();
        for entry_id in ordered {
            let specialty = match self.store.entry(entry_id) {
                Some(entry) => entry.specialty.clone(),
                None => continue,
            };
            let ahead = *ahead_in_specialty.get(&specialty).unwrap_or(&0);
            let estimate = self.estimator.estimate(ahead, &specialty, now);
            if let Some(entry) = self.store.entry_mut(entry_id) {
                entry.estimated_wait_time = estimate;
            }
            *ahead_in_specialty.entry(specialty).or_insert(0) += 1;
        }
    }

    /// Publish the committed state: the full ordered waiting list, the
    /// targeted per-patient update, and the fresh statistics snapshot, in
    /// that order.
    async fn commit_and_publish(&mut self, updated_entry: QueueEntry) {
        let (waiting, statistics) = self.commit_snapshot();
        self.publish(vec![
            Event::QueueChanged(QueueChangedEvent::new(self.hospital_id, waiting)),
            Event::EntryUpdated(EntryUpdatedEvent::new(updated_entry)),
            Event::StatisticsChanged(StatisticsChangedEvent::new(statistics)),
        ])
        .await;
    }

    /// Swap in a fresh committed snapshot for lock-free readers.
    fn commit_snapshot(&mut self) -> (Vec<QueueEntry>, QueueStatistics) {
        let waiting = self.store.waiting_entries();
        let statistics = stats::compute(self.store.hospital_id(), self.store.entries(), Utc::now());
        if let Ok(mut snapshot) = self.snapshot.write() {
            snapshot.waiting = waiting.clone();
            snapshot.statistics = statistics.clone();
        }
        (waiting, statistics)
    }

    /// Fan events out to subscribers. Delivery failures never fail the
    /// command that produced the event; the caller already holds a durable
    /// result.
    async fn publish(&self, events: Vec<Event>) {
        let mut notifications = self.notifications.lock().await;
        for event in events {
            if let Err(e) = notifications.publish(event).await {
                log::warn!("event delivery incomplete: {}", e);
            }
        }
    }
}
