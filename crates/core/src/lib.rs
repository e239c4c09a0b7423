//! Core types for the ZTGate zero-trust access gate.
//!
//! This crate provides the shared data model (posture snapshots, risk
//! assessments, verdicts), configuration and logging used across the
//! ZTGate workspace.

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use config::{Config, LedgerConfig, LoggingConfig, RiskWeights};
pub use error::{Error, Result};
pub use types::{
    DenialKind, IdentityResult, IpReputation, OsTier, Outcome, PostureSnapshot, RiskAssessment,
    RiskContext, RiskTier, Verdict,
};
