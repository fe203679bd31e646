//! Simulated confidential-computation backend
//!
//! Stands in for the external FHE library in tests and in the demo node.
//! Plaintexts live in a table keyed by random handles; every operation mints
//! a fresh handle, so equal plaintexts never share a handle.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::crypto::CryptoUtils;
use crate::fhe::{CiphertextHandle, ClearValue, ComputeError, ConfidentialCompute, EncryptedBool, EncryptedU32};

#[derive(Debug, Default)]
pub struct SimulatedCompute {
    /// handle -> plaintext
    table: DashMap<CiphertextHandle, ClearValue>,
}

impl SimulatedCompute {
    pub fn new() -> Self {
        Self::default()
    }

    /// Client-side encryption of an integer
    pub fn encrypt_u32(&self, value: u32) -> EncryptedU32 {
        EncryptedU32::from_handle(self.mint(ClearValue::U32(value)))
    }

    /// Client-side encryption of a boolean
    pub fn encrypt_bool(&self, value: bool) -> EncryptedBool {
        EncryptedBool::from_handle(self.mint(ClearValue::Bool(value)))
    }

    /// Oracle-side decryption of any handle
    pub fn reveal(&self, handle: &CiphertextHandle) -> Result<ClearValue, ComputeError> {
        if !handle.is_initialized() {
            return Err(ComputeError::Uninitialized);
        }
        self.table
            .get(handle)
            .map(|value| *value)
            .ok_or(ComputeError::UnknownHandle(*handle))
    }

    pub fn decrypt_u32(&self, ciphertext: &EncryptedU32) -> Result<u32, ComputeError> {
        match self.reveal(&ciphertext.handle())? {
            ClearValue::U32(value) => Ok(value),
            ClearValue::Bool(_) => Err(ComputeError::TypeMismatch(ciphertext.handle(), "uint32")),
        }
    }

    pub fn decrypt_bool(&self, ciphertext: &EncryptedBool) -> Result<bool, ComputeError> {
        match self.reveal(&ciphertext.handle())? {
            ClearValue::Bool(value) => Ok(value),
            ClearValue::U32(_) => Err(ComputeError::TypeMismatch(ciphertext.handle(), "bool")),
        }
    }

    /// Every ciphertext with its plaintext, for persisting the table
    pub fn entries(&self) -> Vec<(CiphertextHandle, ClearValue)> {
        self.table.iter().map(|item| (*item.key(), *item.value())).collect()
    }

    /// Rebuild a table from [`SimulatedCompute::entries`]
    pub fn from_entries(entries: impl IntoIterator<Item = (CiphertextHandle, ClearValue)>) -> Self {
        let compute = Self::new();
        for (handle, value) in entries {
            if handle.is_initialized() {
                compute.table.insert(handle, value);
            }
        }
        compute
    }

    /// Number of live ciphertexts
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    fn decrypt_or_zero(&self, ciphertext: &EncryptedU32) -> Result<u32, ComputeError> {
        if ciphertext.is_initialized() {
            self.decrypt_u32(ciphertext)
        } else {
            Ok(0)
        }
    }

    fn mint(&self, value: ClearValue) -> CiphertextHandle {
        loop {
            let handle = CiphertextHandle::from_bytes(CryptoUtils::random_32());
            if !handle.is_initialized() {
                continue;
            }
            if let Entry::Vacant(slot) = self.table.entry(handle) {
                slot.insert(value);
                return handle;
            }
        }
    }
}

impl ConfidentialCompute for SimulatedCompute {
    /// Uninitialized operands read as encrypted zero
    fn add(&self, lhs: &EncryptedU32, rhs: &EncryptedU32) -> Result<EncryptedU32, ComputeError> {
        let a = self.decrypt_or_zero(lhs)?;
        let b = self.decrypt_or_zero(rhs)?;
        Ok(EncryptedU32::from_handle(self.mint(ClearValue::U32(a.wrapping_add(b)))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_and_reveal() {
        let compute = SimulatedCompute::new();
        let points = compute.encrypt_u32(42);
        let eligible = compute.encrypt_bool(true);

        assert_ne!(points.handle(), eligible.handle());
        assert_eq!(compute.decrypt_u32(&points).unwrap(), 42);
        assert!(compute.decrypt_bool(&eligible).unwrap());
        assert_eq!(compute.len(), 2);
    }

    #[test]
    fn test_entries_rebuild_table() {
        let compute = SimulatedCompute::new();
        let points = compute.encrypt_u32(42);
        let eligible = compute.encrypt_bool(true);

        let copy = SimulatedCompute::from_entries(compute.entries());
        assert_eq!(copy.len(), 2);
        assert_eq!(copy.decrypt_u32(&points).unwrap(), 42);
        assert!(copy.decrypt_bool(&eligible).unwrap());
    }

    #[test]
    fn test_equal_plaintexts_get_distinct_handles() {
        let compute = SimulatedCompute::new();
        assert_ne!(compute.encrypt_u32(7), compute.encrypt_u32(7));
    }

    #[test]
    fn test_add_mints_new_handle() {
        let compute = SimulatedCompute::new();
        let a = compute.encrypt_u32(5);
        let b = compute.encrypt_u32(3);

        let sum = compute.add(&a, &b).unwrap();
        assert_ne!(sum, a);
        assert_eq!(compute.decrypt_u32(&sum).unwrap(), 8);
        // operands are untouched
        assert_eq!(compute.decrypt_u32(&a).unwrap(), 5);
    }

    #[test]
    fn test_add_wraps() {
        let compute = SimulatedCompute::new();
        let a = compute.encrypt_u32(u32::MAX);
        let b = compute.encrypt_u32(2);
        let sum = compute.add(&a, &b).unwrap();
        assert_eq!(compute.decrypt_u32(&sum).unwrap(), 1);
    }

    #[test]
    fn test_add_rejects_bad_operands() {
        let compute = SimulatedCompute::new();
        let a = compute.encrypt_u32(1);
        let flag = compute.encrypt_bool(false);
        let foreign = EncryptedU32::from_handle(CiphertextHandle::from_bytes([9u8; 32]));

        assert_eq!(
            compute.decrypt_u32(&EncryptedU32::uninitialized()),
            Err(ComputeError::Uninitialized)
        );
        assert!(matches!(compute.add(&a, &foreign), Err(ComputeError::UnknownHandle(_))));

        let as_u32 = EncryptedU32::from_handle(flag.handle());
        assert!(matches!(compute.add(&a, &as_u32), Err(ComputeError::TypeMismatch(_, _))));
    }

    #[test]
    fn test_add_treats_uninitialized_as_zero() {
        let compute = SimulatedCompute::new();
        let a = compute.encrypt_u32(9);
        let sum = compute.add(&a, &EncryptedU32::uninitialized()).unwrap();
        assert_eq!(compute.decrypt_u32(&sum).unwrap(), 9);

        let zero = compute
            .add(&EncryptedU32::uninitialized(), &EncryptedU32::uninitialized())
            .unwrap();
        assert!(zero.is_initialized());
        assert_eq!(compute.decrypt_u32(&zero).unwrap(), 0);
    }

    #[test]
    fn test_initialization_check() {
        let compute = SimulatedCompute::new();
        let a = compute.encrypt_u32(1);
        assert!(compute.is_initialized(&a.handle()));
        assert!(!compute.is_initialized(&CiphertextHandle::UNINITIALIZED));
        // initialization is a property of the handle, not of the table
        assert!(compute.is_initialized(&CiphertextHandle::from_bytes([3u8; 32])));
    }
}
