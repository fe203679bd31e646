//! Confidential Record Store
//!
//! Owns confidential records, their revealed plaintexts, the pending
//! decryption table and the per-campaign confidential accumulators.
//!
//! Locking: each record is mutated only while its `records` entry guard is
//! held, which serialises request/resolve on the same record. Lock order is
//! `records` -> `requests` -> `waiters`, and `campaigns` -> `campaign_order`;
//! no code path acquires them in the other direction.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, oneshot};

use crate::fhe::{ConfidentialCompute, EncryptedBool, EncryptedU32};
use crate::oracle::{decode_record_payload, DecryptionOracle, DecryptionProof, ProofVerifier};
use crate::store::types::unix_now;
use crate::store::{
    CampaignAccumulator, ConfidentialRecord, PendingDecryption, RecordId, RequestId, RevealedRecord, StoreError,
    StoreEvent, StoreSnapshot, StoreStats,
};

/// Store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Permit a new decryption request while an earlier one for the same
    /// record is still unresolved. The first valid resolution wins.
    pub allow_concurrent_requests: bool,
    /// Capacity of the event broadcast channel
    pub event_buffer: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            allow_concurrent_requests: false,
            event_buffer: 256,
        }
    }
}

struct RecordEntry {
    record: ConfidentialRecord,
    revealed: RevealedRecord,
    /// Latest unresolved request
    in_flight: Option<RequestId>,
}

struct Waiter {
    record_id: RecordId,
    senders: Vec<oneshot::Sender<RevealedRecord>>,
}

pub struct RecordStore {
    config: StoreConfig,
    compute: Arc<dyn ConfidentialCompute>,
    oracle: Arc<dyn DecryptionOracle>,
    verifier: ProofVerifier,
    next_record_id: AtomicU64,
    records: DashMap<RecordId, RecordEntry>,
    /// Kept after resolution so replays are recognised
    requests: DashMap<RequestId, PendingDecryption>,
    campaigns: DashMap<String, CampaignAccumulator>,
    campaign_order: RwLock<Vec<String>>,
    waiters: Mutex<HashMap<RequestId, Waiter>>,
    events: broadcast::Sender<StoreEvent>,
}

impl RecordStore {
    pub fn new(
        config: StoreConfig,
        compute: Arc<dyn ConfidentialCompute>,
        oracle: Arc<dyn DecryptionOracle>,
        verifier: ProofVerifier,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_buffer.max(1));
        Self {
            config,
            compute,
            oracle,
            verifier,
            next_record_id: AtomicU64::new(1),
            records: DashMap::new(),
            requests: DashMap::new(),
            campaigns: DashMap::new(),
            campaign_order: RwLock::new(Vec::new()),
            waiters: Mutex::new(HashMap::new()),
            events,
        }
    }

    /// Rebuild a store from a snapshot
    pub fn restore(
        snapshot: StoreSnapshot,
        config: StoreConfig,
        compute: Arc<dyn ConfidentialCompute>,
        oracle: Arc<dyn DecryptionOracle>,
        verifier: ProofVerifier,
    ) -> Self {
        let store = Self::new(config, compute, oracle, verifier);

        let highest_id = snapshot.records.iter().map(|(record, _)| record.id.0).max().unwrap_or(0);
        store
            .next_record_id
            .store(snapshot.next_record_id.max(highest_id + 1), Ordering::SeqCst);

        for (record, revealed) in snapshot.records {
            store.records.insert(
                record.id,
                RecordEntry {
                    record,
                    revealed,
                    in_flight: None,
                },
            );
        }

        for pending in snapshot.requests {
            {
                let Some(mut entry) = store.records.get_mut(&pending.record_id) else {
                    log::warn!(
                        "dropping {} from snapshot: record {} is missing",
                        pending.request_id,
                        pending.record_id
                    );
                    continue;
                };
                let newer = entry.in_flight.map_or(true, |current| current < pending.request_id);
                if !entry.revealed.revealed && newer {
                    entry.in_flight = Some(pending.request_id);
                }
            }
            store.requests.insert(pending.request_id, pending);
        }

        {
            let mut order = store.campaign_order.write();
            for campaign in snapshot.campaigns {
                order.push(campaign.name.clone());
                store.campaigns.insert(campaign.name.clone(), campaign);
            }
        }

        log::info!(
            "restored {} records, {} requests, {} campaigns",
            store.records.len(),
            store.requests.len(),
            store.campaigns.len()
        );
        store
    }

    /// Store a new confidential record and return its id
    pub fn create_record(&self, encrypted_value: EncryptedU32, encrypted_flag: EncryptedBool) -> RecordId {
        let id = RecordId(self.next_record_id.fetch_add(1, Ordering::SeqCst));
        let created_at = unix_now();
        let record = ConfidentialRecord {
            id,
            encrypted_value,
            encrypted_flag,
            created_at,
        };

        // emit under the guard so the created event precedes any request event
        let entry = self.records.entry(id).or_insert(RecordEntry {
            record,
            revealed: RevealedRecord::default(),
            in_flight: None,
        });
        self.emit(StoreEvent::RecordCreated { id, created_at });
        drop(entry);

        log::info!("created record {}", id);
        id
    }

    /// Submit a record's ciphertexts to the oracle.
    ///
    /// Returns as soon as the request is registered; the plaintext arrives
    /// later through [`RecordStore::resolve_decryption`].
    pub fn request_decryption(&self, record_id: RecordId) -> Result<RequestId, StoreError> {
        let mut entry = self.records.get_mut(&record_id).ok_or(StoreError::NotFound(record_id))?;

        if entry.revealed.revealed {
            return Err(StoreError::AlreadyRevealed(record_id));
        }
        if let Some(request_id) = entry.in_flight {
            if !self.config.allow_concurrent_requests {
                return Err(StoreError::RequestPending { record_id, request_id });
            }
        }

        let pending = PendingDecryption {
            request_id: self.oracle.issue_request_id(),
            record_id,
            requested_at: unix_now(),
        };
        let request_id = pending.request_id;
        let handles = [
            entry.record.encrypted_value.handle(),
            entry.record.encrypted_flag.handle(),
        ];

        // registered before submission so an immediate callback finds it
        self.requests.insert(request_id, pending.clone());
        if let Err(e) = self.oracle.submit(&pending, &handles) {
            self.requests.remove(&request_id);
            log::error!("oracle refused {} for record {}: {}", request_id, record_id, e);
            return Err(e.into());
        }

        entry.in_flight = Some(request_id);
        self.emit(StoreEvent::DecryptionRequested { record_id, request_id });
        drop(entry);

        log::info!("requested decryption of record {} as {}", record_id, request_id);
        Ok(request_id)
    }

    /// Oracle callback.
    ///
    /// Checks run in order: known request, not yet revealed, proof, payload
    /// decoding. Any failure leaves the record untouched and the request
    /// pending.
    pub fn resolve_decryption(
        &self,
        request_id: RequestId,
        payload: &[u8],
        proof: &DecryptionProof,
    ) -> Result<RevealedRecord, StoreError> {
        let record_id = self
            .request_record(request_id)
            .ok_or(StoreError::UnknownRequest(request_id))?;
        let mut entry = self
            .records
            .get_mut(&record_id)
            .ok_or(StoreError::UnknownRequest(request_id))?;

        if entry.revealed.revealed {
            self.notify_request(request_id, entry.revealed);
            log::debug!("ignoring replayed {} for revealed record {}", request_id, record_id);
            return Err(StoreError::AlreadyRevealed(record_id));
        }

        if !self.verifier.verify(request_id, payload, proof) {
            log::warn!("rejected proof for {} (record {})", request_id, record_id);
            return Err(StoreError::InvalidProof(request_id));
        }

        let (value, flag) = decode_record_payload(payload).map_err(|e| {
            log::warn!("undecodable payload for {} (record {}): {}", request_id, record_id, e);
            StoreError::from(e)
        })?;

        let revealed = RevealedRecord {
            value,
            flag,
            revealed: true,
        };
        entry.revealed = revealed;
        entry.in_flight = None;
        self.emit(StoreEvent::RecordDecrypted { record_id });
        self.notify_record(record_id, revealed);
        drop(entry);

        log::info!("record {} revealed by {}", record_id, request_id);
        Ok(revealed)
    }

    /// Plaintext view of a record. Unknown and unrevealed records both read
    /// as zeros with `revealed = false`.
    pub fn get_revealed(&self, record_id: RecordId) -> RevealedRecord {
        self.records
            .get(&record_id)
            .map(|entry| entry.revealed)
            .unwrap_or_default()
    }

    pub fn get_record(&self, record_id: RecordId) -> Option<ConfidentialRecord> {
        self.records.get(&record_id).map(|entry| entry.record.clone())
    }

    /// Record a request was issued for, resolved or not
    pub fn request_record(&self, request_id: RequestId) -> Option<RecordId> {
        self.requests.get(&request_id).map(|pending| pending.record_id)
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// One-shot notification for a request's outcome.
    ///
    /// Fires with the revealed record once the record it targets is revealed,
    /// immediately if that has already happened.
    pub fn watch_request(&self, request_id: RequestId) -> Result<oneshot::Receiver<RevealedRecord>, StoreError> {
        let record_id = self
            .request_record(request_id)
            .ok_or(StoreError::UnknownRequest(request_id))?;
        let entry = self
            .records
            .get(&record_id)
            .ok_or(StoreError::UnknownRequest(request_id))?;

        let (sender, receiver) = oneshot::channel();
        if entry.revealed.revealed {
            let _ = sender.send(entry.revealed);
        } else {
            self.waiters
                .lock()
                .entry(request_id)
                .or_insert_with(|| Waiter {
                    record_id,
                    senders: Vec::new(),
                })
                .senders
                .push(sender);
        }
        Ok(receiver)
    }

    /// Requests whose record is not revealed yet, oldest first
    pub fn pending_requests(&self) -> Vec<PendingDecryption> {
        let mut pending: Vec<PendingDecryption> = self.requests.iter().map(|item| item.value().clone()).collect();
        pending.retain(|request| !self.get_revealed(request.record_id).revealed);
        pending.sort_by_key(|request| request.request_id);
        pending
    }

    /// Hand every unresolved request back to the oracle under its original id.
    ///
    /// Used after a restore: the oracle that received them before the restart
    /// is gone, and the records stay in flight until these are answered.
    pub fn resubmit_pending(&self) -> Result<usize, StoreError> {
        let mut resubmitted = 0;
        for pending in self.pending_requests() {
            let Some(entry) = self.records.get(&pending.record_id) else {
                continue;
            };
            if entry.revealed.revealed {
                continue;
            }
            let handles = [
                entry.record.encrypted_value.handle(),
                entry.record.encrypted_flag.handle(),
            ];
            self.oracle.submit(&pending, &handles)?;
            drop(entry);

            log::info!("resubmitted {} for record {}", pending.request_id, pending.record_id);
            resubmitted += 1;
        }
        Ok(resubmitted)
    }

    /// Fold `delta` into a campaign's confidential total. Never decrypts.
    pub fn accumulate_campaign(&self, campaign: &str, delta: EncryptedU32) -> Result<(), StoreError> {
        match self.campaigns.entry(campaign.to_string()) {
            Entry::Occupied(mut occupied) => {
                let accumulator = occupied.get_mut();
                if !self.compute.is_initialized(&delta.handle()) {
                    // encrypted zero: total unchanged
                } else if self.compute.is_initialized(&accumulator.encrypted_total.handle()) {
                    accumulator.encrypted_total = self.compute.add(&accumulator.encrypted_total, &delta)?;
                } else {
                    accumulator.encrypted_total = delta;
                }
                accumulator.contributions += 1;
                log::debug!("campaign {} now has {} contributions", campaign, accumulator.contributions);
            }
            Entry::Vacant(vacant) => {
                self.campaign_order.write().push(campaign.to_string());
                vacant.insert(CampaignAccumulator {
                    name: campaign.to_string(),
                    encrypted_total: delta,
                    contributions: 1,
                });
                log::info!("registered campaign {}", campaign);
            }
        }
        Ok(())
    }

    /// Confidential total, or the uninitialized handle for an unknown campaign
    pub fn get_campaign_total(&self, campaign: &str) -> EncryptedU32 {
        self.campaigns
            .get(campaign)
            .map(|accumulator| accumulator.encrypted_total)
            .unwrap_or_else(EncryptedU32::uninitialized)
    }

    pub fn get_campaign(&self, campaign: &str) -> Option<CampaignAccumulator> {
        self.campaigns.get(campaign).map(|accumulator| accumulator.clone())
    }

    /// Campaign names in registration order
    pub fn list_campaigns(&self) -> Vec<String> {
        self.campaign_order.read().clone()
    }

    /// Campaign accumulators in registration order
    pub fn campaigns(&self) -> Vec<CampaignAccumulator> {
        self.list_campaigns()
            .iter()
            .filter_map(|name| self.get_campaign(name))
            .collect()
    }

    pub fn stats(&self) -> StoreStats {
        let revealed = self.records.iter().filter(|entry| entry.revealed.revealed).count();
        StoreStats {
            records: self.records.len(),
            revealed,
            pending_requests: self.pending_requests().len(),
            campaigns: self.campaigns.len(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        let mut records: Vec<(ConfidentialRecord, RevealedRecord)> = self
            .records
            .iter()
            .map(|entry| (entry.record.clone(), entry.revealed))
            .collect();
        records.sort_by_key(|(record, _)| record.id);

        let mut requests: Vec<PendingDecryption> = self.requests.iter().map(|item| item.value().clone()).collect();
        requests.sort_by_key(|request| request.request_id);

        StoreSnapshot {
            next_record_id: self.next_record_id.load(Ordering::SeqCst),
            records,
            requests,
            campaigns: self.campaigns(),
        }
    }

    fn emit(&self, event: StoreEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    fn notify_request(&self, request_id: RequestId, revealed: RevealedRecord) {
        if let Some(waiter) = self.waiters.lock().remove(&request_id) {
            for sender in waiter.senders {
                let _ = sender.send(revealed);
            }
        }
    }

    fn notify_record(&self, record_id: RecordId, revealed: RevealedRecord) {
        self.waiters.lock().retain(|_, waiter| {
            if waiter.record_id != record_id {
                return true;
            }
            for sender in waiter.senders.drain(..) {
                let _ = sender.send(revealed);
            }
            false
        });
    }
}
