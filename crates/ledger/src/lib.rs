//! Tamper-evident audit ledger for ZTGate.
//!
//! This crate provides:
//! - Canonical block encoding and SHA-256 hash linking
//! - Bounded proof-of-work sealing
//! - Full-chain verification reporting the first invalid index
//! - A pluggable persistence adapter with memory and SQLite backends
//! - `AuditLedger`, the single-writer owner of the chain

pub mod block;
pub mod ledger;
pub mod seal;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod store;
pub mod verify;

pub use block::{
    compute_hash, meets_difficulty, Block, BlockPayload, GenesisPayload, LedgerEntry, GENESIS_MESSAGE,
    GENESIS_PREVIOUS_HASH,
};
pub use ledger::{current_timestamp_ms, AuditLedger, LedgerError, LedgerHealth, LedgerMetrics};
pub use seal::{SealError, Sealer};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteBlockStore;
pub use store::{BlockStore, MemoryBlockStore, StoreError};
pub use verify::{verify_chain, ChainVerification};
