//! Decryption Oracle Module
//!
//! The oracle decrypts ciphertext handles outside the store's control flow
//! and reports back through [`RecordStore::resolve_decryption`] with a
//! signed proof. Delivery is at-least-once.
//!
//! [`RecordStore::resolve_decryption`]: crate::store::RecordStore::resolve_decryption

pub mod codec;
pub mod gateway;
pub mod proof;

// Re-export main types
pub use codec::{decode_record_payload, encode_cleartexts, encode_record_payload, CodecError};
pub use gateway::{DecryptionJob, GatewayConfig, GatewayWorker, SimulatedGateway};
pub use proof::{decryption_message, DecryptionProof, ProofVerifier};

use crate::fhe::CiphertextHandle;
use crate::store::{PendingDecryption, RequestId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    #[error("oracle queue is closed")]
    QueueClosed,
}

/// Decryption submission primitive of the confidential-computation library
pub trait DecryptionOracle: Send + Sync {
    /// Reserve the identifier the oracle will call back with.
    fn issue_request_id(&self) -> RequestId;

    /// Hand ciphertexts to the oracle. Must not block on decryption.
    fn submit(&self, request: &PendingDecryption, handles: &[CiphertextHandle]) -> Result<(), OracleError>;
}
