//! Queue Error Types

use crate::core::error_handling::ContextualError;
use crate::queue::types::QueueStatus;
use uuid::Uuid;

#[derive(Debug, Clone, thiserror::Error)]
pub enum QueueError {
    #[error("patient {patient_id} already has an active entry at hospital {hospital_id}")]
    DuplicateActiveEntry { hospital_id: Uuid, patient_id: Uuid },

    #[error(
        "no eligible waiting entries at hospital {hospital_id} (specialty: {})",
        specialty.as_deref().unwrap_or("any")
    )]
    QueueEmpty {
        hospital_id: Uuid,
        specialty: Option<String>,
    },

    #[error("entry {entry_id} cannot {action} while {from}")]
    InvalidTransition {
        entry_id: Uuid,
        from: QueueStatus,
        action: &'static str,
    },

    #[error("entry not found: {entry_id}")]
    EntryNotFound { entry_id: Uuid },

    #[error("hospital {hospital_id} command domain still busy after {waited_ms} ms")]
    ActorBusyTimeout { hospital_id: Uuid, waited_ms: u64 },

    #[error("durable store write failed: {message}")]
    StoreWriteFailure { message: String },
}

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

impl ContextualError for QueueError {
    fn is_user_actionable(&self) -> bool {
        match self {
            QueueError::DuplicateActiveEntry { .. }
            | QueueError::QueueEmpty { .. }
            | QueueError::InvalidTransition { .. }
            | QueueError::EntryNotFound { .. } => true,
            QueueError::ActorBusyTimeout { .. } | QueueError::StoreWriteFailure { .. } => false,
        }
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            QueueError::DuplicateActiveEntry { .. } => {
                Some("this patient is already waiting at this hospital")
            }
            QueueError::QueueEmpty { .. } => Some("the queue is empty"),
            QueueError::InvalidTransition { .. } => {
                Some("this entry is not in a state that allows the requested change")
            }
            QueueError::EntryNotFound { .. } => Some("no queue entry with that id exists"),
            _ => None,
        }
    }
}
