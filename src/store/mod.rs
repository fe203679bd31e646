//! Confidential Record Store Module
//!
//! Records, decryption bookkeeping and campaign accumulators.

pub mod error;
pub mod events;
pub mod record_store;
pub mod snapshot;
pub mod types;

// Re-export main types
pub use error::StoreError;
pub use events::StoreEvent;
pub use record_store::{RecordStore, StoreConfig};
pub use snapshot::StoreSnapshot;
pub use types::{
    CampaignAccumulator, ConfidentialRecord, PendingDecryption, RecordId, RequestId, RevealedRecord, StoreStats,
};
