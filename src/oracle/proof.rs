//! Decryption proofs
//!
//! A proof is a set of oracle signatures over
//! `keccak256(domain || request_id || keccak256(payload))`. It is accepted when
//! at least `threshold` distinct trusted signers signed that exact message.

use serde::{Deserialize, Serialize};

use crate::crypto::{CryptoContext, CryptoError, CryptoResult, CryptoUtils, OraclePublicKey, OracleSignature, OracleSigningKey};
use crate::store::RequestId;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionProof {
    pub signatures: Vec<OracleSignature>,
}

impl DecryptionProof {
    /// Sign `(request_id, payload)` with every key in `signers`
    pub fn sign(request_id: RequestId, payload: &[u8], signers: &[OracleSigningKey]) -> CryptoResult<Self> {
        let message = decryption_message(request_id, payload);
        let signatures = signers
            .iter()
            .map(|key| key.sign(&message))
            .collect::<CryptoResult<Vec<_>>>()?;
        Ok(Self { signatures })
    }
}

/// Message the oracle signers commit to
pub fn decryption_message(request_id: RequestId, payload: &[u8]) -> [u8; 32] {
    let context = CryptoContext::decryption_context();
    let mut data = Vec::with_capacity(32 + 8 + 32);
    data.extend_from_slice(&context.domain);
    data.extend_from_slice(&request_id.0.to_be_bytes());
    data.extend_from_slice(&CryptoUtils::keccak256(payload));
    CryptoUtils::keccak256(&data)
}

/// Threshold verifier over a fixed set of trusted oracle signers
#[derive(Debug, Clone)]
pub struct ProofVerifier {
    trusted: Vec<OraclePublicKey>,
    threshold: usize,
}

impl ProofVerifier {
    pub fn new(trusted: Vec<OraclePublicKey>, threshold: usize) -> CryptoResult<Self> {
        if threshold == 0 {
            return Err(CryptoError::InvalidInput("proof threshold must be at least 1".to_string()));
        }
        if threshold > trusted.len() {
            return Err(CryptoError::InvalidInput(format!(
                "proof threshold {} exceeds {} trusted signers",
                threshold,
                trusted.len()
            )));
        }
        Ok(Self { trusted, threshold })
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn signer_count(&self) -> usize {
        self.trusted.len()
    }

    /// Check a proof for `(request_id, payload)`.
    ///
    /// Signatures from unknown keys, invalid signatures and repeated signers
    /// do not count toward the threshold.
    pub fn verify(&self, request_id: RequestId, payload: &[u8], proof: &DecryptionProof) -> bool {
        let message = decryption_message(request_id, payload);
        let mut counted = vec![false; self.trusted.len()];
        let mut valid = 0usize;

        for signature in &proof.signatures {
            let Some(index) = self.trusted.iter().position(|key| key.matches(&signature.signer)) else {
                continue;
            };
            if counted[index] || !signature.verify(&message) {
                continue;
            }
            counted[index] = true;
            valid += 1;
            if valid >= self.threshold {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::SignatureScheme;
    use crate::oracle::codec::encode_record_payload;

    fn signers(n: usize) -> Vec<OracleSigningKey> {
        (0..n)
            .map(|i| {
                let scheme = if i % 2 == 0 { SignatureScheme::Ed25519 } else { SignatureScheme::Ecdsa };
                OracleSigningKey::generate(scheme).unwrap()
            })
            .collect()
    }

    fn verifier(keys: &[OracleSigningKey], threshold: usize) -> ProofVerifier {
        ProofVerifier::new(keys.iter().map(|k| k.public_key()).collect(), threshold).unwrap()
    }

    #[test]
    fn test_threshold_bounds() {
        let keys = signers(2);
        let public: Vec<_> = keys.iter().map(|k| k.public_key()).collect();
        assert!(ProofVerifier::new(public.clone(), 0).is_err());
        assert!(ProofVerifier::new(public.clone(), 3).is_err());
        assert_eq!(ProofVerifier::new(public, 2).unwrap().threshold(), 2);
    }

    #[test]
    fn test_valid_proof_meets_threshold() {
        let keys = signers(3);
        let payload = encode_record_payload(42, true);

        let proof = DecryptionProof::sign(RequestId(1), &payload, &keys[..2]).unwrap();
        assert!(verifier(&keys, 2).verify(RequestId(1), &payload, &proof));

        let short = DecryptionProof::sign(RequestId(1), &payload, &keys[..1]).unwrap();
        assert!(!verifier(&keys, 2).verify(RequestId(1), &payload, &short));
    }

    #[test]
    fn test_proof_bound_to_request_and_payload() {
        let keys = signers(1);
        let verifier = verifier(&keys, 1);
        let payload = encode_record_payload(42, true);
        let proof = DecryptionProof::sign(RequestId(1), &payload, &keys).unwrap();

        assert!(verifier.verify(RequestId(1), &payload, &proof));
        assert!(!verifier.verify(RequestId(2), &payload, &proof));
        assert!(!verifier.verify(RequestId(1), &encode_record_payload(43, true), &proof));
    }

    #[test]
    fn test_repeated_signer_counts_once() {
        let keys = signers(2);
        let payload = encode_record_payload(7, false);
        let mut proof = DecryptionProof::sign(RequestId(5), &payload, &keys[..1]).unwrap();
        proof.signatures.push(proof.signatures[0].clone());

        assert!(!verifier(&keys, 2).verify(RequestId(5), &payload, &proof));
    }

    #[test]
    fn test_untrusted_signer_ignored() {
        let trusted = signers(1);
        let rogue = signers(1);
        let payload = encode_record_payload(7, false);
        let proof = DecryptionProof::sign(RequestId(5), &payload, &rogue).unwrap();

        assert!(!verifier(&trusted, 1).verify(RequestId(5), &payload, &proof));
        assert!(!verifier(&trusted, 1).verify(RequestId(5), &payload, &DecryptionProof::default()));
    }
}
