//! Oracle Signing Keys
//!
//! The decryption oracle authenticates every cleartext it delivers with one
//! signature per signer. Signers use either Ed25519 or ECDSA over secp256k1
//! (Keccak-256 message digest, as on EVM chains).

use ed25519_dalek::{Signature as Ed25519Signature, Signer, SigningKey, Verifier, VerifyingKey};
use secp256k1::{ecdsa, Message, PublicKey, Secp256k1, SecretKey};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::crypto::{domains, CryptoError, CryptoResult, CryptoUtils};

/// Signature algorithm used by an oracle signer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureScheme {
    Ed25519,
    Ecdsa,
}

impl SignatureScheme {
    fn tag(&self) -> u8 {
        match self {
            SignatureScheme::Ed25519 => 0x01,
            SignatureScheme::Ecdsa => 0x02,
        }
    }
}

impl fmt::Display for SignatureScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignatureScheme::Ed25519 => write!(f, "ed25519"),
            SignatureScheme::Ecdsa => write!(f, "ecdsa"),
        }
    }
}

impl FromStr for SignatureScheme {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ed25519" => Ok(SignatureScheme::Ed25519),
            "ecdsa" | "secp256k1" => Ok(SignatureScheme::Ecdsa),
            other => Err(CryptoError::InvalidInput(format!("unknown signature scheme: {}", other))),
        }
    }
}

/// Private key held by one oracle signer
#[derive(Clone)]
pub enum OracleSigningKey {
    Ed25519(SigningKey),
    Ecdsa(SecretKey),
}

impl OracleSigningKey {
    /// Generate a fresh random key
    pub fn generate(scheme: SignatureScheme) -> CryptoResult<Self> {
        Self::from_bytes(scheme, &CryptoUtils::random_32())
    }

    /// Build a key from 32 bytes of secret material
    pub fn from_bytes(scheme: SignatureScheme, bytes: &[u8; 32]) -> CryptoResult<Self> {
        match scheme {
            SignatureScheme::Ed25519 => Ok(Self::Ed25519(SigningKey::from_bytes(bytes))),
            SignatureScheme::Ecdsa => SecretKey::from_slice(bytes)
                .map(Self::Ecdsa)
                .map_err(|e| CryptoError::InvalidPrivateKey(e.to_string())),
        }
    }

    /// Secret material, the inverse of [`OracleSigningKey::from_bytes`]
    pub fn to_bytes(&self) -> [u8; 32] {
        match self {
            Self::Ed25519(key) => key.to_bytes(),
            Self::Ecdsa(key) => key.secret_bytes(),
        }
    }

    pub fn scheme(&self) -> SignatureScheme {
        match self {
            Self::Ed25519(_) => SignatureScheme::Ed25519,
            Self::Ecdsa(_) => SignatureScheme::Ecdsa,
        }
    }

    /// Public half of this key
    pub fn public_key(&self) -> OraclePublicKey {
        let bytes = match self {
            Self::Ed25519(key) => key.verifying_key().to_bytes().to_vec(),
            Self::Ecdsa(key) => {
                let secp = Secp256k1::signing_only();
                key.public_key(&secp).serialize().to_vec()
            }
        };
        OraclePublicKey {
            scheme: self.scheme(),
            bytes,
        }
    }

    /// Sign a message
    pub fn sign(&self, message: &[u8]) -> CryptoResult<OracleSignature> {
        let signature = match self {
            Self::Ed25519(key) => key.sign(message).to_bytes().to_vec(),
            Self::Ecdsa(key) => {
                let secp = Secp256k1::signing_only();
                let message = ecdsa_message(message)?;
                secp.sign_ecdsa(&message, key).serialize_compact().to_vec()
            }
        };
        Ok(OracleSignature {
            signer: self.public_key(),
            signature,
        })
    }
}

impl fmt::Debug for OracleSigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fingerprint = self.public_key().fingerprint();
        write!(f, "OracleSigningKey({}, {})", self.scheme(), hex::encode(&fingerprint[..8]))
    }
}

/// Public key of an oracle signer
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OraclePublicKey {
    pub scheme: SignatureScheme,
    /// 32 bytes for Ed25519, 33-byte compressed point for ECDSA
    #[serde(with = "super::hex_serde")]
    pub bytes: Vec<u8>,
}

impl OraclePublicKey {
    /// Verify a raw signature over `message`.
    ///
    /// Returns `Ok(false)` for a well-formed signature that does not verify and
    /// an error when the key or signature bytes cannot be parsed.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> CryptoResult<bool> {
        match self.scheme {
            SignatureScheme::Ed25519 => {
                let key_bytes: [u8; 32] = self.bytes.as_slice().try_into().map_err(|_| {
                    CryptoError::InvalidPublicKey(format!("expected 32 bytes, got {}", self.bytes.len()))
                })?;
                let public_key = VerifyingKey::from_bytes(&key_bytes)
                    .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
                let sig_bytes: [u8; 64] = signature.try_into().map_err(|_| {
                    CryptoError::InvalidSignature(format!("expected 64 bytes, got {}", signature.len()))
                })?;
                let signature = Ed25519Signature::from_bytes(&sig_bytes);
                Ok(public_key.verify(message, &signature).is_ok())
            }
            SignatureScheme::Ecdsa => {
                let public_key = PublicKey::from_slice(&self.bytes)
                    .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
                let signature = ecdsa::Signature::from_compact(signature)
                    .map_err(|e| CryptoError::InvalidSignature(e.to_string()))?;
                let message = ecdsa_message(message)?;
                let secp = Secp256k1::verification_only();
                Ok(secp.verify_ecdsa(&message, &signature, &public_key).is_ok())
            }
        }
    }

    /// Stable identifier used in logs
    pub fn fingerprint(&self) -> [u8; 32] {
        let mut data = Vec::with_capacity(domains::DOMAIN_SIGNER.len() + 1 + self.bytes.len());
        data.extend_from_slice(domains::DOMAIN_SIGNER);
        data.push(self.scheme.tag());
        data.extend_from_slice(&self.bytes);
        CryptoUtils::sha256(&data)
    }

    /// Constant-time key equality
    pub fn matches(&self, other: &OraclePublicKey) -> bool {
        self.scheme == other.scheme && CryptoUtils::constant_time_eq(&self.bytes, &other.bytes)
    }
}

/// One signer's signature, tagged with the key that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleSignature {
    pub signer: OraclePublicKey,
    #[serde(with = "super::hex_serde")]
    pub signature: Vec<u8>,
}

impl OracleSignature {
    /// Malformed signatures count as invalid.
    pub fn verify(&self, message: &[u8]) -> bool {
        self.signer.verify(message, &self.signature).unwrap_or(false)
    }
}

fn ecdsa_message(message: &[u8]) -> CryptoResult<Message> {
    let digest = CryptoUtils::keccak256(message);
    Message::from_digest_slice(&digest).map_err(|e| CryptoError::HashError(e.to_string()))
}
