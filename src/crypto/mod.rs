//! Cryptographic Primitives Module
//!
//! Hashing helpers, domain separation and the signing keys the decryption
//! oracle uses to authenticate cleartexts:
//! - Ed25519 and ECDSA (secp256k1) oracle signatures
//! - Keccak-256 / SHA-256 / Blake2s digests
//! - Hex (de)serialization for byte fields

use rand::RngCore;
use sha2::Digest;

pub mod signatures;

// Re-export main types
pub use signatures::*;

/// Cryptographic error types
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("Hash function error: {0}")]
    HashError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for cryptographic operations
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Cryptographic context for domain separation
#[derive(Debug, Clone)]
pub struct CryptoContext {
    /// Domain separator for this context
    pub domain: [u8; 32],
}

impl CryptoContext {
    /// Create new cryptographic context
    pub fn new(domain: &str) -> Self {
        Self {
            domain: CryptoUtils::blake2s256(domain.as_bytes()),
        }
    }

    /// Context for oracle decryption proofs
    pub fn decryption_context() -> Self {
        Self::new(domains::DOMAIN_DECRYPTION)
    }
}

/// Domain constants for cryptographic operations
pub mod domains {
    /// Domain separator for decryption proofs
    pub const DOMAIN_DECRYPTION: &str = "confidential-records-decryption";

    /// Domain separator for signer fingerprints
    pub const DOMAIN_SIGNER: &[u8] = b"confidential-records-signer";
}

/// Cryptographic utilities
pub struct CryptoUtils;

impl CryptoUtils {
    /// Generate random 32-byte array
    pub fn random_32() -> [u8; 32] {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        bytes
    }

    /// Hash data with Blake2s-256
    pub fn blake2s256(data: &[u8]) -> [u8; 32] {
        blake2::Blake2s256::digest(data).into()
    }

    /// Hash data with SHA-256
    pub fn sha256(data: &[u8]) -> [u8; 32] {
        sha2::Sha256::digest(data).into()
    }

    /// Hash data with Keccak-256
    pub fn keccak256(data: &[u8]) -> [u8; 32] {
        sha3::Keccak256::digest(data).into()
    }

    /// Constant-time comparison of byte arrays
    pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
        use subtle::ConstantTimeEq;
        a.ct_eq(b).into()
    }

    /// Convert bytes to `0x`-prefixed hex string
    pub fn to_hex(bytes: &[u8]) -> String {
        format!("0x{}", hex::encode(bytes))
    }

    /// Convert hex string (with or without `0x`) to bytes
    pub fn from_hex(hex_str: &str) -> CryptoResult<Vec<u8>> {
        let clean = hex_str.strip_prefix("0x").unwrap_or(hex_str);
        hex::decode(clean).map_err(|e| CryptoError::SerializationError(e.to_string()))
    }
}

/// Serde helpers that store byte vectors as `0x`-prefixed hex strings
pub mod hex_serde {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::CryptoUtils::to_hex(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        super::CryptoUtils::from_hex(&encoded).map_err(serde::de::Error::custom)
    }
}
