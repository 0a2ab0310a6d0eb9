//! Type definitions for the hospital queue engine
//!
//! Core data structures shared across the engine: queue entries, the
//! clinical priority and status enums, statistics snapshots, and the
//! check-in command payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum_macros::{Display, EnumString};
use uuid::Uuid;

/// Clinical urgency tier governing queue ordering.
///
/// Variants are declared from most to least urgent, so the derived ordering
/// matches queue rank: `Emergency` sorts ahead of everything else. The wire
/// labels are the SCREAMING_SNAKE names; display labels (such as "ROUTINE"
/// for `Normal`) are a dashboard concern and do not appear here.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum QueuePriority {
    Emergency,
    Urgent,
    SemiUrgent,
    Normal,
    Low,
}

impl QueuePriority {
    /// All priorities, most urgent first. Statistics snapshots carry a count
    /// for every tier even when it is zero.
    pub const ALL: [QueuePriority; 5] = [
        QueuePriority::Emergency,
        QueuePriority::Urgent,
        QueuePriority::SemiUrgent,
        QueuePriority::Normal,
        QueuePriority::Low,
    ];

    /// Numeric rank used by the Priority Clock; lower is more urgent.
    pub fn rank(&self) -> u8 {
        match self {
            QueuePriority::Emergency => 0,
            QueuePriority::Urgent => 1,
            QueuePriority::SemiUrgent => 2,
            QueuePriority::Normal => 3,
            QueuePriority::Low => 4,
        }
    }
}

/// Lifecycle state of a queue entry.
///
/// `Waiting` is the initial state. `Completed`, `Cancelled` and `NoShow` are
/// terminal; no transition leaves them.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum QueueStatus {
    Waiting,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

impl QueueStatus {
    /// Whether the entry still occupies its patient's single active slot.
    pub fn is_active(&self) -> bool {
        matches!(self, QueueStatus::Waiting | QueueStatus::InProgress)
    }

    /// Whether the state admits no further transitions.
    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }
}

/// One patient's position in one hospital's queue.
///
/// Identity fields (`id`, `hospital_id`, `patient_id`, `check_in_time`,
/// `sequence`) are immutable once created; only status, ordering, timing and
/// assignment fields mutate, and only through the hospital's actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    pub id: Uuid,
    pub hospital_id: Uuid,
    pub patient_id: Uuid,
    pub priority: QueuePriority,
    pub status: QueueStatus,
    pub specialty: String,
    pub symptoms: String,
    pub check_in_time: DateTime<Utc>,
    /// Set exactly on the transition to `InProgress`.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub start_time: Option<DateTime<Utc>>,
    /// Set exactly on the transition to `Completed`.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub end_time: Option<DateTime<Utc>>,
    /// Assigned no later than the `InProgress` transition.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub doctor_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub room_number: Option<String>,
    /// Estimated wait in minutes; `None` when no service history exists.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub estimated_wait_time: Option<u32>,
    /// 1-based rank among this hospital's WAITING entries; `None` otherwise.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub position: Option<u32>,
    /// Consultation notes recorded on completion.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub notes: Option<String>,
    /// Reason recorded on cancellation.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub cancel_reason: Option<String>,
    /// Per-hospital check-in sequence assigned by the Priority Clock;
    /// breaks ordering ties between identical check-in timestamps.
    pub sequence: u64,
}

impl QueueEntry {
    /// Create a fresh WAITING entry from a check-in command. Position and
    /// estimate are filled in by the actor's reorder pass.
    pub fn new(request: CheckInRequest, check_in_time: DateTime<Utc>, sequence: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            hospital_id: request.hospital_id,
            patient_id: request.patient_id,
            priority: request.priority,
            status: QueueStatus::Waiting,
            specialty: request.specialty,
            symptoms: request.symptoms,
            check_in_time,
            start_time: None,
            end_time: None,
            doctor_id: None,
            room_number: None,
            estimated_wait_time: None,
            position: None,
            notes: None,
            cancel_reason: None,
            sequence,
        }
    }
}

/// Payload of the check-in command.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInRequest {
    pub hospital_id: Uuid,
    pub patient_id: Uuid,
    pub priority: QueuePriority,
    pub specialty: String,
    pub symptoms: String,
}

/// Point-in-time derived view of one hospital's queue.
///
/// Ephemeral: recomputed on every mutation and on the refresh timer, never
/// persisted as a source of truth.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatistics {
    pub hospital_id: Uuid,
    pub total_waiting: usize,
    /// Mean minutes the currently WAITING entries have already waited.
    pub average_wait_time: f64,
    /// Count per priority tier; every tier is present, zero included.
    pub by_priority: BTreeMap<QueuePriority, usize>,
    pub by_specialty: BTreeMap<String, usize>,
    pub timestamp: DateTime<Utc>,
}
