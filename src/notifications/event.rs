//! Event types for the queue notification system

use crate::queue::types::{QueueEntry, QueueStatistics};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Ordered list of a hospital's WAITING entries with recomputed positions
/// and estimates; emitted after every committed mutation.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueChangedEvent {
    pub hospital_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub entries: Vec<QueueEntry>,
}

impl QueueChangedEvent {
    pub fn new(hospital_id: Uuid, entries: Vec<QueueEntry>) -> Self {
        Self {
            hospital_id,
            timestamp: Utc::now(),
            entries,
        }
    }
}

/// Single-entry update targeted at that patient's subscribers.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryUpdatedEvent {
    pub hospital_id: Uuid,
    pub patient_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub entry: QueueEntry,
}

impl EntryUpdatedEvent {
    pub fn new(entry: QueueEntry) -> Self {
        Self {
            hospital_id: entry.hospital_id,
            patient_id: entry.patient_id,
            timestamp: Utc::now(),
            entry,
        }
    }
}

/// Aggregate statistics snapshot for one hospital.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsChangedEvent {
    pub hospital_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub statistics: QueueStatistics,
}

impl StatisticsChangedEvent {
    pub fn new(statistics: QueueStatistics) -> Self {
        Self {
            hospital_id: statistics.hospital_id,
            timestamp: Utc::now(),
            statistics,
        }
    }
}

/// Unified event enum covering every queue event kind.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", content = "payload")]
pub enum Event {
    #[serde(rename = "queue.changed")]
    QueueChanged(QueueChangedEvent),
    #[serde(rename = "queue.entry.updated")]
    EntryUpdated(EntryUpdatedEvent),
    #[serde(rename = "queue.statistics.changed")]
    StatisticsChanged(StatisticsChangedEvent),
}

impl Event {
    pub fn hospital_id(&self) -> Uuid {
        match self {
            Event::QueueChanged(e) => e.hospital_id,
            Event::EntryUpdated(e) => e.hospital_id,
            Event::StatisticsChanged(e) => e.hospital_id,
        }
    }

    /// Wire name of the event kind, as delivered to transports.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::QueueChanged(_) => "queue.changed",
            Event::EntryUpdated(_) => "queue.entry.updated",
            Event::StatisticsChanged(_) => "queue.statistics.changed",
        }
    }
}

/// Subscription scope for subscribers.
///
/// `Hospital` corresponds to `join:hospital` and receives the hospital's
/// `queue.changed` and `queue.statistics.changed` stream; `Patient`
/// corresponds to `join:patient` and receives only `queue.entry.updated`
/// events for that patient. `All` is an unscoped firehose for audit-style
/// subscribers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventFilter {
    Hospital(Uuid),
    Patient(Uuid),
    All,
}

impl EventFilter {
    /// Check if an event should be delivered under this filter.
    pub fn accepts(&self, event: &Event) -> bool {
        match (self, event) {
            (EventFilter::All, _) => true,
            (EventFilter::Hospital(id), Event::QueueChanged(e)) => e.hospital_id == *id,
            (EventFilter::Hospital(id), Event::StatisticsChanged(e)) => e.hospital_id == *id,
            (EventFilter::Hospital(_), Event::EntryUpdated(_)) => false,
            (EventFilter::Patient(id), Event::EntryUpdated(e)) => e.patient_id == *id,
            (EventFilter::Patient(_), _) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::types::{CheckInRequest, QueuePriority};

    fn entry_for(hospital_id: Uuid, patient_id: Uuid) -> QueueEntry {
        QueueEntry::new(
            CheckInRequest {
                hospital_id,
                patient_id,
                priority: QueuePriority::Normal,
                specialty: "general".to_string(),
                symptoms: "test".to_string(),
            },
            Utc::now(),
            1,
        )
    }

    #[test]
    fn hospital_filter_scopes_queue_and_statistics_events() {
        let hospital = Uuid::new_v4();
        let other = Uuid::new_v4();
        let filter = EventFilter::Hospital(hospital);

        let ours = Event::QueueChanged(QueueChangedEvent::new(hospital, vec![]));
        let theirs = Event::QueueChanged(QueueChangedEvent::new(other, vec![]));
        assert!(filter.accepts(&ours));
        assert!(!filter.accepts(&theirs));

        // Entry updates are patient-targeted, not hospital-broadcast
        let update = Event::EntryUpdated(EntryUpdatedEvent::new(entry_for(
            hospital,
            Uuid::new_v4(),
        )));
        assert!(!filter.accepts(&update));
    }

    #[test]
    fn patient_filter_only_sees_own_entry_updates() {
        let hospital = Uuid::new_v4();
        let patient = Uuid::new_v4();
        let filter = EventFilter::Patient(patient);

        let own = Event::EntryUpdated(EntryUpdatedEvent::new(entry_for(hospital, patient)));
        let foreign =
            Event::EntryUpdated(EntryUpdatedEvent::new(entry_for(hospital, Uuid::new_v4())));
        let broadcast = Event::QueueChanged(QueueChangedEvent::new(hospital, vec![]));

        assert!(filter.accepts(&own));
        assert!(!filter.accepts(&foreign));
        assert!(!filter.accepts(&broadcast));
    }

    #[test]
    fn all_filter_accepts_everything() {
        let filter = EventFilter::All;
        let hospital = Uuid::new_v4();
        assert!(filter.accepts(&Event::QueueChanged(QueueChangedEvent::new(hospital, vec![]))));
        assert!(filter.accepts(&Event::EntryUpdated(EntryUpdatedEvent::new(entry_for(
            hospital,
            Uuid::new_v4()
        )))));
    }

    #[test]
    fn events_serialize_with_wire_names() {
        let hospital = Uuid::new_v4();
        let event = Event::QueueChanged(QueueChangedEvent::new(hospital, vec![]));
        assert_eq!(event.kind(), "queue.changed");

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "queue.changed");
        assert!(json["payload"].get("hospitalId").is_some());
    }
}
