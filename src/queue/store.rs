//! Per-hospital queue store
//!
//! In-memory ordered collection of one hospital's queue entries. The WAITING
//! set is indexed by a `BTreeMap` keyed on the Priority Clock's `OrderingKey`,
//! with hash indexes by entry id and by active patient id for O(1) existence
//! checks. This structure is a derived cache of the durable store; the actor
//! rebuilds it from repository rows on startup and only applies mutations
//! after the corresponding durable write has committed.

use crate::queue::clock::OrderingKey;
use crate::queue::error::{QueueError, QueueResult};
use crate::queue::types::{QueueEntry, QueueStatus};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

#[derive(Debug)]
pub struct QueueStore {
    hospital_id: Uuid,
    /// Every entry seen by this hospital, terminal rows included.
    entries: HashMap<Uuid, QueueEntry>,
    /// WAITING entries in queue order.
    waiting: BTreeMap<OrderingKey, Uuid>,
    /// Reverse index for removing WAITING entries without recomputing keys.
    key_by_entry: HashMap<Uuid, OrderingKey>,
    /// patient id -> entry id for entries in WAITING or IN_PROGRESS.
    active_by_patient: HashMap<Uuid, Uuid>,
}

impl QueueStore {
    pub fn new(hospital_id: Uuid) -> Self {
        Self {
            hospital_id,
            entries: HashMap::new(),
            waiting: BTreeMap::new(),
            key_by_entry: HashMap::new(),
            active_by_patient: HashMap::new(),
        }
    }

    pub fn hospital_id(&self) -> Uuid {
        self.hospital_id
    }

    pub fn has_active_patient(&self, patient_id: Uuid) -> bool {
        self.active_by_patient.contains_key(&patient_id)
    }

    /// Add a new WAITING entry. Fails if the patient already holds an active
    /// entry at this hospital; the store is unchanged on failure.
    pub fn insert(&mut self, entry: QueueEntry) -> QueueResult<()> {
        debug_assert_eq!(entry.status, QueueStatus::Waiting);
        if self.has_active_patient(entry.patient_id) {
            return Err(QueueError::DuplicateActiveEntry {
                hospital_id: self.hospital_id,
                patient_id: entry.patient_id,
            });
        }
        self.apply(entry);
        Ok(())
    }

    /// Upsert a committed entry row and bring every index in line with its
    /// status. Terminal rows are retained for statistics and history but
    /// leave the WAITING index and release the patient's active slot.
    pub fn apply(&mut self, entry: QueueEntry) {
        let entry_id = entry.id;

        if let Some(old_key) = self.key_by_entry.remove(&entry_id) {
            self.waiting.remove(&old_key);
        }

        match entry.status {
            QueueStatus::Waiting => {
                let key = Self::key_of(&entry);
                self.waiting.insert(key, entry_id);
                self.key_by_entry.insert(entry_id, key);
                self.active_by_patient.insert(entry.patient_id, entry_id);
            }
            QueueStatus::InProgress => {
                self.active_by_patient.insert(entry.patient_id, entry_id);
            }
            _ => {
                if self.active_by_patient.get(&entry.patient_id) == Some(&entry_id) {
                    self.active_by_patient.remove(&entry.patient_id);
                }
            }
        }

        self.entries.insert(entry_id, entry);
    }

    pub fn entry(&self, entry_id: Uuid) -> Option<&QueueEntry> {
        self.entries.get(&entry_id)
    }

    /// Look up an entry for mutation-by-clone; the actor persists the clone
    /// and feeds it back through [`QueueStore::apply`].
    pub fn entry_cloned(&self, entry_id: Uuid) -> QueueResult<QueueEntry> {
        self.entries
            .get(&entry_id)
            .cloned()
            .ok_or(QueueError::EntryNotFound { entry_id })
    }

    /// Highest-priority WAITING entry, optionally filtered to a specialty.
    pub fn peek_next(&self, specialty: Option<&str>) -> Option<&QueueEntry> {
        self.waiting.values().find_map(|id| {
            let entry = self.entries.get(id)?;
            match specialty {
                Some(s) if entry.specialty != s => None,
                _ => Some(entry),
            }
        })
    }

    /// Recompute contiguous 1-based positions across all WAITING entries.
    pub fn reorder(&mut self) {
        let ordered: Vec<Uuid> = self.waiting.values().copied().collect();
        for (index, entry_id) in ordered.into_iter().enumerate() {
            if let Some(entry) = self.entries.get_mut(&entry_id) {
                entry.position = Some(index as u32 + 1);
            }
        }
    }

    pub fn waiting_count(&self) -> usize {
        self.waiting.len()
    }

    /// WAITING entry ids in queue order.
    pub fn waiting_ids(&self) -> Vec<Uuid> {
        self.waiting.values().copied().collect()
    }

    /// Cloned WAITING entries in queue order; this is the payload of
    /// `queue.changed` events and snapshot queries.
    pub fn waiting_entries(&self) -> Vec<QueueEntry> {
        self.waiting
            .values()
            .filter_map(|id| self.entries.get(id).cloned())
            .collect()
    }

    /// Every retained entry, in no particular order.
    pub fn entries(&self) -> impl Iterator<Item = &QueueEntry> {
        self.entries.values()
    }

    pub(crate) fn entry_mut(&mut self, entry_id: Uuid) -> Option<&mut QueueEntry> {
        self.entries.get_mut(&entry_id)
    }

    fn key_of(entry: &QueueEntry) -> OrderingKey {
        OrderingKey::new(entry.priority, entry.check_in_time, entry.sequence)
    }
}
