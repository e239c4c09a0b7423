//! Gate error types

use thiserror::Error;
use ztgate_ledger::LedgerError;

#[derive(Debug, Error)]
pub enum GateError {
    /// Rejected before evaluation; nothing is recorded
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The verdict could not be durably recorded, so none is returned
    #[error("Audit ledger unavailable: {0}")]
    Ledger(#[from] LedgerError),

    /// Read-only query attempted without a verified identity
    #[error("Access denied: {0}")]
    AccessDenied(String),
}

impl GateError {
    /// Whether the caller should surface this as "service unavailable"
    /// rather than as an authorization decision.
    pub fn is_service_unavailable(&self) -> bool {
        matches!(
            self,
            GateError::Ledger(LedgerError::SealTimeout { .. })
                | GateError::Ledger(LedgerError::Storage(_))
                | GateError::Ledger(LedgerError::Corrupted { .. })
                | GateError::Ledger(LedgerError::LockPoisoned)
        )
    }
}

impl From<ztgate_core::Error> for GateError {
    fn from(err: ztgate_core::Error) -> Self {
        match err {
            ztgate_core::Error::InvalidInput(msg) => GateError::InvalidInput(msg),
            other => GateError::InvalidInput(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, GateError>;
