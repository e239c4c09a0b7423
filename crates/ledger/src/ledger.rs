//! Audit Ledger - append-only, hash-linked chain of sealed blocks
//!
//! # Guarantees
//!
//! - Single writer: every append holds the store mutex from reading the
//!   last block until the new block is visible to readers
//! - Durable before visible: a block joins the in-memory chain only after
//!   the store accepted it, so a failed write never advances the chain
//! - Snapshot reads: `latest` and `verify` read committed blocks only and
//!   never wait on an in-flight seal
//! - Fail closed: a ledger whose chain failed verification refuses appends

use crate::block::{Block, BlockPayload, LedgerEntry};
use crate::seal::{SealError, Sealer};
use crate::store::{BlockStore, StoreError};
use crate::verify::{verify_chain, ChainVerification};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use ztgate_core::LedgerConfig;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Seal timeout for block {index}: {attempts} nonces tried in {elapsed_ms} ms")]
    SealTimeout {
        index: u64,
        attempts: u64,
        elapsed_ms: u64,
    },

    #[error("Ledger corrupted at block {first_invalid_index}: {reason}")]
    Corrupted {
        first_invalid_index: u64,
        reason: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Ledger lock poisoned")]
    LockPoisoned,
}

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Ledger health status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerHealth {
    Ok,
    Corrupted {
        first_invalid_index: u64,
        reason: String,
    },
}

impl LedgerHealth {
    pub fn is_ok(&self) -> bool {
        matches!(self, LedgerHealth::Ok)
    }
}

/// Point-in-time copy of the ledger counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerMetrics {
    pub blocks_appended_total: u64,
    pub seal_attempts_total: u64,
    pub seal_timeouts_total: u64,
    pub storage_failures_total: u64,
    pub verifications_total: u64,
    pub corruption_detections_total: u64,
}

#[derive(Debug, Default)]
struct Counters {
    blocks_appended: AtomicU64,
    seal_attempts: AtomicU64,
    seal_timeouts: AtomicU64,
    storage_failures: AtomicU64,
    verifications: AtomicU64,
    corruption_detections: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> LedgerMetrics {
        LedgerMetrics {
            blocks_appended_total: self.blocks_appended.load(Ordering::Relaxed),
            seal_attempts_total: self.seal_attempts.load(Ordering::Relaxed),
            seal_timeouts_total: self.seal_timeouts.load(Ordering::Relaxed),
            storage_failures_total: self.storage_failures.load(Ordering::Relaxed),
            verifications_total: self.verifications.load(Ordering::Relaxed),
            corruption_detections_total: self.corruption_detections.load(Ordering::Relaxed),
        }
    }
}

pub struct AuditLedger<S: BlockStore> {
    /// Doubles as the process-wide writer lock
    store: Mutex<S>,
    /// Committed blocks, ascending by index
    chain: RwLock<Vec<Block>>,
    health: RwLock<LedgerHealth>,
    sealer: Sealer,
    node_id: String,
    counters: Counters,
}

impl<S: BlockStore> AuditLedger<S> {
    /// Load the persisted chain, creating genesis if the store is empty,
    /// and run a startup verification.
    ///
    /// A chain that fails verification still opens so that it can be
    /// inspected, but its health is `Corrupted` and appends are refused.
    pub fn open(mut store: S, config: &LedgerConfig) -> Result<Self> {
        let node_id = config.node_id.clone();
        info!(node_id = %node_id, difficulty = config.difficulty, "Opening audit ledger");

        let mut blocks = store.load()?;
        if blocks.is_empty() {
            let genesis = Block::genesis(current_timestamp_ms())?;
            store.store(&genesis)?;
            info!(node_id = %node_id, hash = %genesis.hash, "Created genesis block");
            blocks.push(genesis);
        }

        let ledger = Self {
            store: Mutex::new(store),
            chain: RwLock::new(Vec::new()),
            health: RwLock::new(LedgerHealth::Ok),
            sealer: Sealer::from_config(config),
            node_id,
            counters: Counters::default(),
        };

        let verification = ledger.record_verification(verify_chain(&blocks, ledger.difficulty()));
        if verification.valid {
            info!(
                node_id = %ledger.node_id,
                block_count = blocks.len(),
                "Ledger continuity check passed"
            );
        }
        *ledger.chain.write().map_err(|_| LedgerError::LockPoisoned)? = blocks;

        Ok(ledger)
    }

    /// Seal `entry` into a new block and persist it.
    ///
    /// On `SealTimeout` or `Storage` errors nothing is recorded and the
    /// chain does not advance.
    pub fn append(&self, entry: LedgerEntry) -> Result<Block> {
        let mut store = self.store.lock().map_err(|_| LedgerError::LockPoisoned)?;

        if let LedgerHealth::Corrupted {
            first_invalid_index,
            reason,
        } = self.health()?
        {
            warn!(node_id = %self.node_id, "Attempted to append to corrupted ledger");
            return Err(LedgerError::Corrupted {
                first_invalid_index,
                reason,
            });
        }

        let (index, previous_hash) = {
            let chain = self.chain.read().map_err(|_| LedgerError::LockPoisoned)?;
            let last = chain.last().ok_or_else(|| LedgerError::Corrupted {
                first_invalid_index: 0,
                reason: "missing genesis block".to_string(),
            })?;
            (last.index + 1, last.hash.clone())
        };

        let timestamp = current_timestamp_ms();
        let (block, attempts) = match self.sealer.seal(
            index,
            &previous_hash,
            timestamp,
            BlockPayload::Entry(entry),
        ) {
            Ok(sealed) => sealed,
            Err(SealError::Exhausted {
                attempts,
                elapsed_ms,
            }) => {
                self.counters.seal_attempts.fetch_add(attempts, Ordering::Relaxed);
                self.counters.seal_timeouts.fetch_add(1, Ordering::Relaxed);
                error!(
                    node_id = %self.node_id,
                    index = index,
                    attempts = attempts,
                    elapsed_ms = elapsed_ms,
                    "Seal search exhausted"
                );
                return Err(LedgerError::SealTimeout {
                    index,
                    attempts,
                    elapsed_ms,
                });
            }
            Err(SealError::Serialization(e)) => return Err(e.into()),
        };
        self.counters.seal_attempts.fetch_add(attempts, Ordering::Relaxed);

        if let Err(e) = store.store(&block) {
            self.counters.storage_failures.fetch_add(1, Ordering::Relaxed);
            error!(
                node_id = %self.node_id,
                index = index,
                error = %e,
                "Failed to persist sealed block"
            );
            return Err(e.into());
        }

        self.chain
            .write()
            .map_err(|_| LedgerError::LockPoisoned)?
            .push(block.clone());
        self.counters.blocks_appended.fetch_add(1, Ordering::Relaxed);

        debug!(
            node_id = %self.node_id,
            index = block.index,
            nonce = block.nonce,
            hash = %block.hash,
            "Block appended to ledger"
        );

        drop(store);
        Ok(block)
    }

    /// Highest-index committed block.
    pub fn latest(&self) -> Result<Block> {
        let chain = self.chain.read().map_err(|_| LedgerError::LockPoisoned)?;
        chain.last().cloned().ok_or_else(|| LedgerError::Corrupted {
            first_invalid_index: 0,
            reason: "missing genesis block".to_string(),
        })
    }

    /// Verify the committed chain as of this call.
    pub fn verify(&self) -> Result<ChainVerification> {
        let snapshot = self.snapshot()?;
        Ok(self.record_verification(verify_chain(&snapshot, self.difficulty())))
    }

    /// Re-read the store and verify what is persisted.
    ///
    /// Catches tampering at rest that happened after the ledger was opened.
    /// Holds the writer lock while loading so no append is half-visible.
    pub fn verify_persisted(&self) -> Result<ChainVerification> {
        let persisted = {
            let store = self.store.lock().map_err(|_| LedgerError::LockPoisoned)?;
            store.load()?
        };
        Ok(self.record_verification(verify_chain(&persisted, self.difficulty())))
    }

    /// Up to `limit` most recent blocks, newest first.
    pub fn recent_blocks(&self, limit: usize) -> Result<Vec<Block>> {
        let chain = self.chain.read().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(chain.iter().rev().take(limit).cloned().collect())
    }

    /// Up to `limit` most recent ledger entries, newest first. Genesis is skipped.
    pub fn recent_entries(&self, limit: usize) -> Result<Vec<LedgerEntry>> {
        let chain = self.chain.read().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(chain
            .iter()
            .rev()
            .filter_map(|b| b.entry().cloned())
            .take(limit)
            .collect())
    }

    /// Copy of every committed block, ascending by index.
    pub fn snapshot(&self) -> Result<Vec<Block>> {
        Ok(self
            .chain
            .read()
            .map_err(|_| LedgerError::LockPoisoned)?
            .clone())
    }

    /// Number of committed blocks, genesis included.
    pub fn len(&self) -> Result<usize> {
        Ok(self.chain.read().map_err(|_| LedgerError::LockPoisoned)?.len())
    }

    pub fn health(&self) -> Result<LedgerHealth> {
        Ok(self
            .health
            .read()
            .map_err(|_| LedgerError::LockPoisoned)?
            .clone())
    }

    pub fn metrics(&self) -> LedgerMetrics {
        self.counters.snapshot()
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn difficulty(&self) -> usize {
        self.sealer.difficulty()
    }

    fn record_verification(&self, verification: ChainVerification) -> ChainVerification {
        self.counters.verifications.fetch_add(1, Ordering::Relaxed);

        if let (false, Some(index)) = (verification.valid, verification.first_invalid_index) {
            let reason = verification.error.clone().unwrap_or_default();
            self.counters
                .corruption_detections
                .fetch_add(1, Ordering::Relaxed);
            error!(
                node_id = %self.node_id,
                first_invalid_index = index,
                reason = %reason,
                "Ledger corruption detected"
            );
            if let Ok(mut health) = self.health.write() {
                *health = LedgerHealth::Corrupted {
                    first_invalid_index: index,
                    reason,
                };
            }
        }

        verification
    }
}

/// Current Unix time in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
