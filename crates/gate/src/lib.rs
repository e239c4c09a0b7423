//! ZTGate trust gate
//!
//! `TrustGate` is the only component callers invoke per request: it runs
//! the policy pipeline and seals the verdict into the audit ledger before
//! returning it. `LedgerQuery` is the separate read-only path over the same
//! ledger.

pub mod error;
pub mod gate;
pub mod query;

pub use error::{GateError, Result};
pub use gate::{AccessRequest, TrustGate};
pub use query::{LedgerQuery, DEFAULT_CHAIN_LIMIT};
