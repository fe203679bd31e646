//! Record store data model

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::fhe::{EncryptedBool, EncryptedU32};

/// Record identifier. Issued from 1 upward; 0 means "no such record".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl RecordId {
    pub const NONE: RecordId = RecordId(0);

    pub fn is_none(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Decryption request identifier, issued by the oracle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// Confidential customer record. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidentialRecord {
    pub id: RecordId,
    /// Encrypted loyalty points
    pub encrypted_value: EncryptedU32,
    /// Encrypted eligibility flag
    pub encrypted_flag: EncryptedBool,
    /// Unix seconds
    pub created_at: u64,
}

/// Plaintext view of a record. Fields are meaningful only once `revealed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RevealedRecord {
    pub value: u32,
    pub flag: bool,
    pub revealed: bool,
}

/// Mapping from an oracle request to the record it decrypts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingDecryption {
    pub request_id: RequestId,
    pub record_id: RecordId,
    /// Unix seconds
    pub requested_at: u64,
}

/// Running confidential sum for one campaign
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignAccumulator {
    pub name: String,
    pub encrypted_total: EncryptedU32,
    /// Number of deltas folded in
    pub contributions: u64,
}

/// Store counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StoreStats {
    pub records: usize,
    pub revealed: usize,
    pub pending_requests: usize,
    pub campaigns: usize,
}

pub(crate) fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}
