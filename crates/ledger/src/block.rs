//! Sealed blocks and their canonical hash.
//!
//! A block hash is the lowercase hex SHA-256 of the UTF-8 concatenation
//!
//! ```text
//! decimal(index) ‖ previous_hash ‖ decimal(timestamp_ms) ‖ canonical(payload) ‖ decimal(nonce)
//! ```
//!
//! where `canonical(payload)` is compact `serde_json` output with struct
//! fields in declaration order. Field order and names below are therefore
//! part of the on-disk format.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use ztgate_core::{Outcome, PostureSnapshot, RiskTier, Verdict};

/// Sentinel message carried by the index-0 block.
pub const GENESIS_MESSAGE: &str = "Genesis Block - Zero Trust Ledger Started";

/// `previous_hash` of the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// Record of one trust evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LedgerEntry {
    pub subject: String,
    pub action: String,
    pub outcome: Outcome,
    pub tier: RiskTier,
    pub score: u32,
    pub posture: PostureSnapshot,
    pub reasons: Vec<String>,
    /// Unix milliseconds at which the verdict was reached
    pub sealed_at: u64,
}

impl LedgerEntry {
    pub fn from_verdict(
        subject: impl Into<String>,
        action: impl Into<String>,
        posture: PostureSnapshot,
        verdict: &Verdict,
        sealed_at: u64,
    ) -> Self {
        Self {
            subject: subject.into(),
            action: action.into(),
            outcome: verdict.outcome(),
            tier: verdict.tier,
            score: verdict.score,
            posture,
            reasons: verdict.reasons.clone(),
            sealed_at,
        }
    }
}

/// Payload of the index-0 block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenesisPayload {
    pub message: String,
}

impl GenesisPayload {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Data carried by a block: the genesis sentinel or a ledger entry.
///
/// `Unreadable` holds stored payload text that does not decode to either
/// form or does not re-encode to the same bytes. It never verifies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlockPayload {
    Entry(LedgerEntry),
    Genesis(GenesisPayload),
    Unreadable(String),
}

impl BlockPayload {
    pub fn genesis() -> Self {
        BlockPayload::Genesis(GenesisPayload::new(GENESIS_MESSAGE))
    }

    /// Decode stored payload text, keeping it verbatim when it does not
    /// round-trip through the canonical encoding.
    pub fn from_stored(text: &str) -> Self {
        match serde_json::from_str::<BlockPayload>(text) {
            Ok(payload @ (BlockPayload::Entry(_) | BlockPayload::Genesis(_)))
                if payload.canonical().ok().as_deref() == Some(text) =>
            {
                payload
            }
            _ => BlockPayload::Unreadable(text.to_string()),
        }
    }

    /// Compact JSON used as hash input.
    pub fn canonical(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn is_readable(&self) -> bool {
        !matches!(self, BlockPayload::Unreadable(_))
    }

    pub fn as_entry(&self) -> Option<&LedgerEntry> {
        match self {
            BlockPayload::Entry(entry) => Some(entry),
            _ => None,
        }
    }
}

/// A sealed, hash-linked block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub index: u64,
    /// Unix milliseconds
    pub timestamp: u64,
    pub payload: BlockPayload,
    pub previous_hash: String,
    pub hash: String,
    pub nonce: u64,
}

impl Block {
    /// Build the index-0 block. Genesis is not subject to the difficulty target.
    pub fn genesis(timestamp: u64) -> serde_json::Result<Self> {
        let payload = BlockPayload::genesis();
        let hash = compute_hash(
            0,
            GENESIS_PREVIOUS_HASH,
            timestamp,
            &payload.canonical()?,
            0,
        );
        Ok(Self {
            index: 0,
            timestamp,
            payload,
            previous_hash: GENESIS_PREVIOUS_HASH.to_string(),
            hash,
            nonce: 0,
        })
    }

    /// Recompute the hash from the stored fields.
    pub fn recompute_hash(&self) -> serde_json::Result<String> {
        Ok(compute_hash(
            self.index,
            &self.previous_hash,
            self.timestamp,
            &self.payload.canonical()?,
            self.nonce,
        ))
    }

    pub fn is_genesis(&self) -> bool {
        self.index == 0
    }

    pub fn entry(&self) -> Option<&LedgerEntry> {
        self.payload.as_entry()
    }
}

/// Hasher primed with everything except the nonce.
///
/// Sealing clones this state per attempt instead of re-hashing the payload.
#[derive(Clone)]
pub(crate) struct HashPrefix(Sha256);

impl HashPrefix {
    pub(crate) fn new(
        index: u64,
        previous_hash: &str,
        timestamp: u64,
        canonical_payload: &str,
    ) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(index.to_string().as_bytes());
        hasher.update(previous_hash.as_bytes());
        hasher.update(timestamp.to_string().as_bytes());
        hasher.update(canonical_payload.as_bytes());
        Self(hasher)
    }

    pub(crate) fn finish(&self, nonce: u64) -> String {
        let mut hasher = self.0.clone();
        hasher.update(nonce.to_string().as_bytes());
        hex::encode(hasher.finalize())
    }
}

pub fn compute_hash(
    index: u64,
    previous_hash: &str,
    timestamp: u64,
    canonical_payload: &str,
    nonce: u64,
) -> String {
    HashPrefix::new(index, previous_hash, timestamp, canonical_payload).finish(nonce)
}

/// Whether `hash` starts with `difficulty` zero nibbles.
pub fn meets_difficulty(hash: &str, difficulty: usize) -> bool {
    hash.len() >= difficulty && hash.bytes().take(difficulty).all(|b| b == b'0')
}
