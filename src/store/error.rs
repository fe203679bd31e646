use crate::fhe::ComputeError;
use crate::oracle::{CodecError, OracleError};
use crate::store::{RecordId, RequestId};

/// Record store error types
///
/// Every variant is returned before any state is touched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("record {0} not found")]
    NotFound(RecordId),

    #[error("record {0} is already revealed")]
    AlreadyRevealed(RecordId),

    #[error("unknown decryption request {0}")]
    UnknownRequest(RequestId),

    #[error("decryption proof rejected for request {0}")]
    InvalidProof(RequestId),

    #[error("malformed cleartext payload: {0}")]
    DecodeError(#[from] CodecError),

    #[error("record {record_id} already has decryption request {request_id} in flight")]
    RequestPending {
        record_id: RecordId,
        request_id: RequestId,
    },

    #[error("oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("confidential compute error: {0}")]
    Compute(#[from] ComputeError),
}

impl StoreError {
    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::NotFound(_) => "NOT_FOUND",
            StoreError::AlreadyRevealed(_) => "ALREADY_REVEALED",
            StoreError::UnknownRequest(_) => "UNKNOWN_REQUEST",
            StoreError::InvalidProof(_) => "INVALID_PROOF",
            StoreError::DecodeError(_) => "DECODE_ERROR",
            StoreError::RequestPending { .. } => "REQUEST_PENDING",
            StoreError::Oracle(_) => "ORACLE_UNAVAILABLE",
            StoreError::Compute(_) => "COMPUTE_ERROR",
        }
    }
}
