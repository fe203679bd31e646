//! Store snapshots
//!
//! A bincode image of the store's durable state. Handles are stored as-is;
//! the ciphertexts they point to belong to the computation backend.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::store::{CampaignAccumulator, ConfidentialRecord, PendingDecryption, RequestId, RevealedRecord};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub next_record_id: u64,
    pub records: Vec<(ConfidentialRecord, RevealedRecord)>,
    /// Every request ever issued, resolved or not
    pub requests: Vec<PendingDecryption>,
    /// In registration order
    pub campaigns: Vec<CampaignAccumulator>,
}

impl StoreSnapshot {
    /// Highest request id in the snapshot, `RequestId(0)` if none
    pub fn last_request_id(&self) -> RequestId {
        self.requests
            .iter()
            .map(|request| request.request_id)
            .max()
            .unwrap_or(RequestId(0))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        save_bincode(self, path.as_ref())?;
        log::info!(
            "saved snapshot with {} records to {}",
            self.records.len(),
            path.as_ref().display()
        );
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        load_bincode(path.as_ref())
    }
}

/// Write `value` as bincode, replacing `path` only once the write succeeded
pub(crate) fn save_bincode<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let bytes = bincode::serialize(value).context("serializing snapshot")?;

    let staging = path.with_extension("tmp");
    fs::write(&staging, bytes).with_context(|| format!("writing {}", staging.display()))?;
    fs::rename(&staging, path).with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}

pub(crate) fn load_bincode<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    bincode::deserialize(&bytes).with_context(|| format!("decoding snapshot {}", path.display()))
}
