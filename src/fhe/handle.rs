//! Opaque ciphertext handles
//!
//! A handle is a 32-byte reference into the confidential-computation backend.
//! Nothing in this crate interprets the bytes beyond the all-zero
//! "uninitialized" sentinel.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::crypto::{CryptoError, CryptoUtils};

/// Handle length in bytes
pub const HANDLE_LEN: usize = 32;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CiphertextHandle([u8; HANDLE_LEN]);

impl CiphertextHandle {
    /// Sentinel for "no ciphertext"
    pub const UNINITIALIZED: Self = Self([0u8; HANDLE_LEN]);

    pub fn from_bytes(bytes: [u8; HANDLE_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; HANDLE_LEN] {
        &self.0
    }

    pub fn is_initialized(&self) -> bool {
        self.0 != [0u8; HANDLE_LEN]
    }

    pub fn to_hex(&self) -> String {
        CryptoUtils::to_hex(&self.0)
    }
}

impl FromStr for CiphertextHandle {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = CryptoUtils::from_hex(s)?;
        let bytes: [u8; HANDLE_LEN] = bytes.as_slice().try_into().map_err(|_| {
            CryptoError::InvalidInput(format!(
                "ciphertext handle must be {} bytes, got {}",
                HANDLE_LEN,
                bytes.len()
            ))
        })?;
        Ok(Self(bytes))
    }
}

impl fmt::Debug for CiphertextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CiphertextHandle({}..)", hex::encode(&self.0[..6]))
    }
}

impl fmt::Display for CiphertextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for CiphertextHandle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for CiphertextHandle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        encoded.parse().map_err(serde::de::Error::custom)
    }
}

/// Confidential 32-bit unsigned integer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncryptedU32(CiphertextHandle);

/// Confidential boolean
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncryptedBool(CiphertextHandle);

macro_rules! typed_handle {
    ($name:ident) => {
        impl $name {
            pub fn from_handle(handle: CiphertextHandle) -> Self {
                Self(handle)
            }

            pub fn uninitialized() -> Self {
                Self(CiphertextHandle::UNINITIALIZED)
            }

            pub fn handle(&self) -> CiphertextHandle {
                self.0
            }

            pub fn is_initialized(&self) -> bool {
                self.0.is_initialized()
            }
        }
    };
}

typed_handle!(EncryptedU32);
typed_handle!(EncryptedBool);
