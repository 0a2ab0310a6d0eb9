//! Priority Clock — deterministic ordering keys for queue entries
//!
//! Combines the clinical priority rank with the check-in timestamp and a
//! per-hospital monotonic sequence number, so any two WAITING entries in the
//! same hospital compare unequal. The sequence tiebreak preserves arrival
//! fairness for check-ins that land on the same timestamp; entry ids are
//! never consulted for ordering.

use crate::queue::types::QueuePriority;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};

/// Sortable key: priority rank first, then arrival time, then arrival
/// sequence. The derived `Ord` is exactly the queue order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OrderingKey {
    pub rank: u8,
    pub checked_in_at: DateTime<Utc>,
    pub sequence: u64,
}

impl OrderingKey {
    pub fn new(priority: QueuePriority, checked_in_at: DateTime<Utc>, sequence: u64) -> Self {
        Self {
            rank: priority.rank(),
            checked_in_at,
            sequence,
        }
    }
}

/// Per-hospital sequence source. Pure with respect to ordering; the only
/// side effect is the counter increment at check-in.
#[derive(Debug)]
pub struct PriorityClock {
    next_sequence: AtomicU64,
}

impl Default for PriorityClock {
    fn default() -> Self {
        Self::new()
    }
}

impl PriorityClock {
    pub fn new() -> Self {
        Self {
            // Start from 1, sequence 0 is never issued
            next_sequence: AtomicU64::new(1),
        }
    }

    /// Issue the next check-in sequence number.
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence.fetch_add(1, Ordering::SeqCst)
    }

    /// Move the counter past sequences already issued before a restart, so
    /// rebuilt queues never reuse a sequence number.
    pub fn resume_after(&self, highest_seen: u64) {
        self.next_sequence
            .fetch_max(highest_seen + 1, Ordering::SeqCst);
    }
}
