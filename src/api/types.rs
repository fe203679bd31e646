//! API Request and Response Types
//!
//! Ciphertext handles travel as 0x-prefixed hex strings, record and request
//! ids as plain integers.

use serde::{Deserialize, Serialize};

use crate::fhe::{EncryptedBool, EncryptedU32};
use crate::oracle::DecryptionProof;
use crate::store::{RecordId, RequestId};

/// Simulated client-side encryption
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptRequest {
    pub value: u32,
    #[serde(default)]
    pub flag: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptResponse {
    pub encrypted_value: EncryptedU32,
    pub encrypted_flag: EncryptedBool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRecordRequest {
    pub encrypted_value: EncryptedU32,
    pub encrypted_flag: EncryptedBool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRecordResponse {
    pub id: RecordId,
    pub created_at: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecryptionRequestResponse {
    pub record_id: RecordId,
    pub request_id: RequestId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevealedRecordResponse {
    pub record_id: RecordId,
    pub value: u32,
    pub flag: bool,
    pub revealed: bool,
}

/// Oracle callback delivered over HTTP
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleCallbackRequest {
    pub request_id: RequestId,
    /// ABI-encoded cleartexts (hex)
    pub payload: String,
    pub proof: DecryptionProof,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccumulateRequest {
    pub encrypted_delta: EncryptedU32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignTotalResponse {
    pub name: String,
    pub encrypted_total: EncryptedU32,
    /// False for campaigns that never received a contribution
    pub initialized: bool,
    pub contributions: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignListResponse {
    pub campaigns: Vec<CampaignTotalResponse>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub records: usize,
    pub pending_requests: usize,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable code
    pub error: String,
    pub message: String,
    pub timestamp: u64,
}
