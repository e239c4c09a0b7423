//! Persistence adapter for sealed blocks.
//!
//! The ledger writes through [`BlockStore`]; the storage engine behind it is
//! interchangeable. A successful `store` must be visible to every later
//! `load`.

use crate::block::Block;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[cfg(feature = "sqlite")]
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Block index {0} already stored")]
    DuplicateIndex(u64),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

pub trait BlockStore: Send {
    /// All persisted blocks in ascending index order.
    fn load(&self) -> Result<Vec<Block>>;

    /// Durably persist one block. Blocks are never updated or deleted.
    fn store(&mut self, block: &Block) -> Result<()>;
}

impl<S: BlockStore + ?Sized> BlockStore for Box<S> {
    fn load(&self) -> Result<Vec<Block>> {
        (**self).load()
    }

    fn store(&mut self, block: &Block) -> Result<()> {
        (**self).store(block)
    }
}

/// In-memory store.
///
/// Clones share the same backing vector, so a test can keep a handle to
/// inspect or tamper with what the ledger persisted.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlockStore {
    blocks: Arc<Mutex<Vec<Block>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryBlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blocks(blocks: Vec<Block>) -> Self {
        Self {
            blocks: Arc::new(Mutex::new(blocks)),
            fail_writes: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Make every subsequent `store` fail until reset.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Copy of the persisted blocks.
    pub fn snapshot(&self) -> Vec<Block> {
        self.blocks
            .lock()
            .map(|blocks| blocks.clone())
            .unwrap_or_default()
    }

    /// Rewrite a persisted block in place, bypassing the ledger.
    ///
    /// Returns false when no block has that index.
    #[doc(hidden)]
    pub fn tamper(&self, index: u64, edit: impl FnOnce(&mut Block)) -> bool {
        let Ok(mut blocks) = self.blocks.lock() else {
            return false;
        };
        match blocks.iter_mut().find(|b| b.index == index) {
            Some(block) => {
                edit(block);
                true
            }
            None => false,
        }
    }
}

impl BlockStore for MemoryBlockStore {
    fn load(&self) -> Result<Vec<Block>> {
        let blocks = self
            .blocks
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store poisoned".to_string()))?;
        let mut blocks = blocks.clone();
        blocks.sort_by_key(|b| b.index);
        Ok(blocks)
    }

    fn store(&mut self, block: &Block) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected write failure".to_string()));
        }
        let mut blocks = self
            .blocks
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store poisoned".to_string()))?;
        if blocks.iter().any(|b| b.index == block.index) {
            return Err(StoreError::DuplicateIndex(block.index));
        }
        blocks.push(block.clone());
        Ok(())
    }
}
