//! Trust evaluation policy for ZTGate.
//!
//! Stateless building blocks of the per-request pipeline:
//! - `PostureEvaluator`: device posture health with itemized issues
//! - `RiskScorer`: additive risk score and tier
//! - `DecisionEngine`: identity → posture → risk gates producing a verdict
//!
//! All three are safe for unlimited concurrent use.

pub mod decision;
pub mod posture;
pub mod risk;

pub use decision::{
    DecisionEngine, DEFAULT_BLOCK_ABOVE, REASON_INVALID_TOKEN, REASON_NO_TOKEN,
    REASON_RISK_EXCEEDED,
};
pub use posture::{PostureEvaluator, PostureReport};
pub use risk::RiskScorer;
