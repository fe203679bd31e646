//! Store notifications for external observers (e.g. a UI)

use serde::{Deserialize, Serialize};

use crate::store::{RecordId, RequestId};

/// Per record, events are emitted in state-machine order:
/// created, then requested, then decrypted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreEvent {
    RecordCreated { id: RecordId, created_at: u64 },
    DecryptionRequested { record_id: RecordId, request_id: RequestId },
    RecordDecrypted { record_id: RecordId },
}

impl StoreEvent {
    pub fn record_id(&self) -> RecordId {
        match self {
            StoreEvent::RecordCreated { id, .. } => *id,
            StoreEvent::DecryptionRequested { record_id, .. } => *record_id,
            StoreEvent::RecordDecrypted { record_id } => *record_id,
        }
    }
}
