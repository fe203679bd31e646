// Core modules
pub mod crypto;
pub mod fhe;
pub mod oracle;
pub mod store;

// Service modules
pub mod api;
pub mod config;
pub mod node;


// Re-export main types for easy access
pub use config::ServiceConfig;
pub use fhe::{CiphertextHandle, ConfidentialCompute, EncryptedBool, EncryptedU32, SimulatedCompute};
pub use oracle::{DecryptionOracle, DecryptionProof, GatewayConfig, ProofVerifier, SimulatedGateway};
pub use store::{RecordId, RecordStore, RequestId, RevealedRecord, StoreConfig, StoreError, StoreEvent};
