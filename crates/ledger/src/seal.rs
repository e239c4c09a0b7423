//! Bounded proof-of-work sealing.
//!
//! The search runs while the ledger's writer lock is held, so it is capped
//! both by nonce count and by wall-clock time.

use crate::block::{meets_difficulty, Block, BlockPayload, HashPrefix};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;
use ztgate_core::LedgerConfig;

/// Nonces tried between wall-clock checks.
const CLOCK_CHECK_INTERVAL: u64 = 1024;

#[derive(Debug, Error)]
pub enum SealError {
    #[error("No valid nonce after {attempts} attempts ({elapsed_ms} ms)")]
    Exhausted { attempts: u64, elapsed_ms: u64 },

    #[error("Payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct Sealer {
    difficulty: usize,
    max_nonce: u64,
    timeout: Duration,
}

impl Sealer {
    pub fn new(difficulty: usize, max_nonce: u64, timeout: Duration) -> Self {
        Self {
            difficulty,
            max_nonce,
            timeout,
        }
    }

    pub fn from_config(config: &LedgerConfig) -> Self {
        Self::new(
            config.difficulty,
            config.max_nonce,
            Duration::from_millis(config.seal_timeout_ms),
        )
    }

    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    /// Search nonces from 0 upward until the hash meets the difficulty target.
    ///
    /// Returns the sealed block and the number of nonces tried.
    pub fn seal(
        &self,
        index: u64,
        previous_hash: &str,
        timestamp: u64,
        payload: BlockPayload,
    ) -> Result<(Block, u64), SealError> {
        let started = Instant::now();
        let prefix = HashPrefix::new(index, previous_hash, timestamp, &payload.canonical()?);

        let mut nonce = 0u64;
        while nonce < self.max_nonce {
            let hash = prefix.finish(nonce);
            if meets_difficulty(&hash, self.difficulty) {
                let attempts = nonce + 1;
                debug!(
                    index = index,
                    nonce = nonce,
                    elapsed_us = started.elapsed().as_micros() as u64,
                    "Block sealed"
                );
                let block = Block {
                    index,
                    timestamp,
                    payload,
                    previous_hash: previous_hash.to_string(),
                    hash,
                    nonce,
                };
                return Ok((block, attempts));
            }

            nonce += 1;
            if nonce % CLOCK_CHECK_INTERVAL == 0 && started.elapsed() >= self.timeout {
                break;
            }
        }

        Err(SealError::Exhausted {
            attempts: nonce,
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }
}

impl Default for Sealer {
    fn default() -> Self {
        Self::from_config(&LedgerConfig::default())
    }
}
