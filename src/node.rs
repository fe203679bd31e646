//! Node wiring
//!
//! Builds the simulated compute backend, oracle signers, gateway and store
//! from a [`ServiceConfig`]. [`NodeState`] carries everything a restart
//! needs: the store snapshot, the simulated ciphertext table and the signer
//! secrets. Requests still unresolved at shutdown are handed back to the new
//! gateway on startup.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::config::ServiceConfig;
use crate::crypto::{OracleSigningKey, SignatureScheme};
use crate::fhe::{CiphertextHandle, ClearValue, SimulatedCompute};
use crate::oracle::{GatewayWorker, ProofVerifier, SimulatedGateway};
use crate::store::snapshot::{load_bincode, save_bincode};
use crate::store::{RecordStore, StoreSnapshot};

/// Persisted oracle signer
#[derive(Clone, Serialize, Deserialize)]
pub struct SignerSeed {
    pub scheme: SignatureScheme,
    pub secret: [u8; 32],
}

/// Durable state of a whole node
#[derive(Clone, Serialize, Deserialize)]
pub struct NodeState {
    pub store: StoreSnapshot,
    pub ciphertexts: Vec<(CiphertextHandle, ClearValue)>,
    pub signers: Vec<SignerSeed>,
}

impl NodeState {
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        save_bincode(self, path)?;
        log::info!(
            "saved node state ({} records, {} ciphertexts) to {}",
            self.store.records.len(),
            self.ciphertexts.len(),
            path.display()
        );
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        load_bincode(path.as_ref())
    }
}

pub struct OracleNode {
    pub store: Arc<RecordStore>,
    pub compute: Arc<SimulatedCompute>,
    signers: Vec<OracleSigningKey>,
}

impl OracleNode {
    /// Assemble a node, resuming from `state` when given.
    ///
    /// The returned worker must be run for callbacks to be delivered.
    pub fn build(config: &ServiceConfig, state: Option<NodeState>) -> Result<(Self, GatewayWorker)> {
        let (snapshot, compute, signers) = match state {
            Some(state) => {
                let signers = state
                    .signers
                    .iter()
                    .map(|seed| OracleSigningKey::from_bytes(seed.scheme, &seed.secret))
                    .collect::<Result<Vec<_>, _>>()
                    .context("restoring oracle signers")?;
                if signers.len() != config.oracle_signers {
                    log::warn!(
                        "keeping {} restored signers, ORACLE_SIGNERS={} ignored",
                        signers.len(),
                        config.oracle_signers
                    );
                }
                (Some(state.store), SimulatedCompute::from_entries(state.ciphertexts), signers)
            }
            None => {
                let signers = (0..config.oracle_signers)
                    .map(|_| OracleSigningKey::generate(config.signature_scheme))
                    .collect::<Result<Vec<_>, _>>()
                    .context("generating oracle signers")?;
                (None, SimulatedCompute::new(), signers)
            }
        };
        for signer in &signers {
            log::info!("oracle signer {:?}", signer);
        }

        let compute = Arc::new(compute);
        let verifier = ProofVerifier::new(
            signers.iter().map(|key| key.public_key()).collect(),
            config.oracle_threshold,
        )
        .context("building proof verifier")?;
        let (gateway, worker) = SimulatedGateway::new(compute.clone(), signers.clone(), config.gateway_config());

        let store = match snapshot {
            Some(snapshot) => {
                gateway.resume_after(snapshot.last_request_id());
                let store = RecordStore::restore(
                    snapshot,
                    config.store_config(),
                    compute.clone(),
                    Arc::new(gateway),
                    verifier,
                );
                let resubmitted = store.resubmit_pending()?;
                if resubmitted > 0 {
                    log::info!("resubmitted {} pending decryptions", resubmitted);
                }
                store
            }
            None => RecordStore::new(config.store_config(), compute.clone(), Arc::new(gateway), verifier),
        };

        let node = Self {
            store: Arc::new(store),
            compute,
            signers,
        };
        Ok((node, worker))
    }

    pub fn export_state(&self) -> NodeState {
        NodeState {
            store: self.store.snapshot(),
            ciphertexts: self.compute.entries(),
            signers: self
                .signers
                .iter()
                .map(|key| SignerSeed {
                    scheme: key.scheme(),
                    secret: key.to_bytes(),
                })
                .collect(),
        }
    }
}
