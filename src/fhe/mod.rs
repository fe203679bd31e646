//! Confidential Values Module
//!
//! Ciphertext handles and the operations the confidential-computation
//! library exposes to this crate. The store only ever combines handles
//! through [`ConfidentialCompute`]; it never sees plaintext.

pub mod handle;
pub mod simulated;

// Re-export main types
pub use handle::{CiphertextHandle, EncryptedBool, EncryptedU32, HANDLE_LEN};
pub use simulated::SimulatedCompute;

use serde::{Deserialize, Serialize};

/// Errors raised by the confidential-computation backend
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComputeError {
    #[error("unknown ciphertext handle {0}")]
    UnknownHandle(CiphertextHandle),

    #[error("ciphertext handle is not initialized")]
    Uninitialized,

    #[error("ciphertext {0} does not hold a {1}")]
    TypeMismatch(CiphertextHandle, &'static str),
}

/// Operations provided by the confidential-computation library
pub trait ConfidentialCompute: Send + Sync {
    /// Confidential addition. Wraps on overflow like the underlying library.
    fn add(&self, lhs: &EncryptedU32, rhs: &EncryptedU32) -> Result<EncryptedU32, ComputeError>;

    /// Initialization check for a handle
    fn is_initialized(&self, handle: &CiphertextHandle) -> bool {
        handle.is_initialized()
    }
}

/// A decrypted value, as produced on the oracle side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClearValue {
    U32(u32),
    Bool(bool),
}
