//! Simulated decryption gateway
//!
//! Plays the external oracle for tests and the demo node: requests are queued
//! on an unbounded channel, and a worker task decrypts them through
//! [`SimulatedCompute`], signs the cleartexts with every configured signer and
//! calls back into the store.

use anyhow::{Context, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::crypto::OracleSigningKey;
use crate::fhe::{CiphertextHandle, SimulatedCompute};
use crate::oracle::{encode_cleartexts, DecryptionOracle, DecryptionProof, OracleError};
use crate::store::{PendingDecryption, RecordId, RecordStore, RequestId, RevealedRecord, StoreError};

/// Gateway delivery behaviour
#[derive(Debug, Clone, Default)]
pub struct GatewayConfig {
    /// Wait before each callback
    pub delivery_delay: Duration,
    /// Deliver every callback twice (at-least-once transport)
    pub redeliver: bool,
}

/// One queued decryption
#[derive(Debug, Clone)]
pub struct DecryptionJob {
    pub request_id: RequestId,
    pub record_id: RecordId,
    pub handles: Vec<CiphertextHandle>,
}

/// Submission side, shared with the store
pub struct SimulatedGateway {
    next_request_id: AtomicU64,
    queue: mpsc::UnboundedSender<DecryptionJob>,
}

impl SimulatedGateway {
    pub fn new(
        compute: Arc<SimulatedCompute>,
        signers: Vec<OracleSigningKey>,
        config: GatewayConfig,
    ) -> (Self, GatewayWorker) {
        let (queue, jobs) = mpsc::unbounded_channel();
        let gateway = Self {
            next_request_id: AtomicU64::new(1),
            queue,
        };
        let worker = GatewayWorker {
            jobs,
            compute,
            signers,
            config,
        };
        (gateway, worker)
    }

    /// Continue numbering after `last`, e.g. when restoring a snapshot
    pub fn resume_after(&self, last: RequestId) {
        self.next_request_id.fetch_max(last.0 + 1, Ordering::SeqCst);
    }
}

impl DecryptionOracle for SimulatedGateway {
    fn issue_request_id(&self) -> RequestId {
        RequestId(self.next_request_id.fetch_add(1, Ordering::SeqCst))
    }

    fn submit(&self, request: &PendingDecryption, handles: &[CiphertextHandle]) -> Result<(), OracleError> {
        self.queue
            .send(DecryptionJob {
                request_id: request.request_id,
                record_id: request.record_id,
                handles: handles.to_vec(),
            })
            .map_err(|_| OracleError::QueueClosed)
    }
}

/// Delivery side, owns the job queue
pub struct GatewayWorker {
    jobs: mpsc::UnboundedReceiver<DecryptionJob>,
    compute: Arc<SimulatedCompute>,
    signers: Vec<OracleSigningKey>,
    config: GatewayConfig,
}

impl GatewayWorker {
    /// Drain the queue until every gateway handle is dropped
    pub async fn run(mut self, store: Arc<RecordStore>) {
        log::info!("decryption gateway started with {} signers", self.signers.len());
        while let Some(job) = self.jobs.recv().await {
            if let Err(e) = self.deliver(&store, &job).await {
                log::error!(
                    "decryption {} for record {} failed: {:?}",
                    job.request_id,
                    job.record_id,
                    e
                );
            }
        }
        log::info!("decryption gateway stopped");
    }

    /// Pop a queued job without waiting
    pub fn try_next_job(&mut self) -> Option<DecryptionJob> {
        self.jobs.try_recv().ok()
    }

    /// Decrypt a job's handles and sign the resulting payload
    pub fn prepare_callback(&self, job: &DecryptionJob) -> Result<(Vec<u8>, DecryptionProof)> {
        let cleartexts = job
            .handles
            .iter()
            .map(|handle| self.compute.reveal(handle))
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("decrypting handles for {}", job.request_id))?;
        let payload = encode_cleartexts(&cleartexts);
        let proof = DecryptionProof::sign(job.request_id, &payload, &self.signers)?;
        Ok((payload, proof))
    }

    /// Run one job through to the store callback
    pub async fn deliver(&self, store: &RecordStore, job: &DecryptionJob) -> Result<RevealedRecord> {
        let (payload, proof) = self.prepare_callback(job)?;

        if !self.config.delivery_delay.is_zero() {
            tokio::time::sleep(self.config.delivery_delay).await;
        }

        let revealed = store
            .resolve_decryption(job.request_id, &payload, &proof)
            .with_context(|| format!("callback for {} rejected", job.request_id))?;
        log::info!("delivered {} for record {}", job.request_id, job.record_id);

        if self.config.redeliver {
            match store.resolve_decryption(job.request_id, &payload, &proof) {
                Err(StoreError::AlreadyRevealed(_)) => {
                    log::debug!("duplicate delivery of {} rejected", job.request_id)
                }
                other => log::warn!(
                    "duplicate delivery of {} was not rejected: {:?}",
                    job.request_id,
                    other
                ),
            }
        }

        Ok(revealed)
    }
}
