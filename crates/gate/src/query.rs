//! Read-only ledger queries
//!
//! Queries re-check that the caller holds a verified identity but never
//! run the trust pipeline and never append, so reading the audit trail does
//! not itself grow the audit trail.

use crate::error::{GateError, Result};
use std::sync::Arc;
use tracing::debug;
use ztgate_core::IdentityResult;
use ztgate_ledger::{AuditLedger, Block, BlockStore, ChainVerification, LedgerEntry};

/// Default number of blocks returned by a chain view.
pub const DEFAULT_CHAIN_LIMIT: usize = 20;

pub struct LedgerQuery<S: BlockStore> {
    ledger: Arc<AuditLedger<S>>,
}

impl<S: BlockStore> LedgerQuery<S> {
    pub fn new(ledger: Arc<AuditLedger<S>>) -> Self {
        Self { ledger }
    }

    /// Last `limit` ledger entries, newest first.
    pub fn recent_entries(
        &self,
        identity: &IdentityResult,
        limit: usize,
    ) -> Result<Vec<LedgerEntry>> {
        authorize(identity)?;
        debug!(subject = %identity.subject(), limit = limit, "Listing ledger entries");
        Ok(self.ledger.recent_entries(limit)?)
    }

    /// Last `limit` blocks, newest first.
    pub fn chain(&self, identity: &IdentityResult, limit: usize) -> Result<Vec<Block>> {
        authorize(identity)?;
        debug!(subject = %identity.subject(), limit = limit, "Reading chain");
        Ok(self.ledger.recent_blocks(limit)?)
    }

    /// Verify the persisted chain.
    pub fn verify(&self, identity: &IdentityResult) -> Result<ChainVerification> {
        authorize(identity)?;
        debug!(subject = %identity.subject(), "Verifying chain");
        Ok(self.ledger.verify_persisted()?)
    }

    /// Highest-index block.
    pub fn latest(&self, identity: &IdentityResult) -> Result<Block> {
        authorize(identity)?;
        Ok(self.ledger.latest()?)
    }
}

fn authorize(identity: &IdentityResult) -> Result<()> {
    match identity {
        IdentityResult::Verified { .. } => Ok(()),
        IdentityResult::Missing => Err(GateError::AccessDenied("No Token".to_string())),
        IdentityResult::Invalid => Err(GateError::AccessDenied("Invalid Token".to_string())),
    }
}
