//! Decision engine
//!
//! Three gates applied in a fixed order, each short-circuiting:
//! 1. identity must be verified by the external collaborator
//! 2. posture must be healthy
//! 3. risk score must not exceed the block threshold
//!
//! The engine is a pure function of its inputs and holds no state besides
//! its configured threshold.

use crate::posture::PostureReport;
use tracing::debug;
use ztgate_core::{DenialKind, IdentityResult, RiskAssessment, RiskTier, RiskWeights, Verdict};

pub const REASON_NO_TOKEN: &str = "No Token";
pub const REASON_INVALID_TOKEN: &str = "Invalid Token";
pub const REASON_RISK_EXCEEDED: &str = "Risk Threshold Exceeded";

/// Default block threshold: scores strictly above this are denied
pub const DEFAULT_BLOCK_ABOVE: u32 = 60;

#[derive(Debug, Clone, Copy)]
pub struct DecisionEngine {
    block_above: u32,
}

impl DecisionEngine {
    pub fn new(block_above: u32) -> Self {
        Self { block_above }
    }

    pub fn from_weights(weights: &RiskWeights) -> Self {
        Self::new(weights.block_above)
    }

    pub fn block_above(&self) -> u32 {
        self.block_above
    }

    pub fn decide(
        &self,
        identity: &IdentityResult,
        posture: &PostureReport,
        risk: &RiskAssessment,
    ) -> Verdict {
        let verdict = match identity {
            IdentityResult::Missing => Verdict::deny(
                DenialKind::IdentityInvalid,
                RiskTier::Critical,
                risk.score,
                vec![REASON_NO_TOKEN.to_string()],
            ),
            IdentityResult::Invalid => Verdict::deny(
                DenialKind::IdentityInvalid,
                RiskTier::High,
                risk.score,
                vec![REASON_INVALID_TOKEN.to_string()],
            ),
            IdentityResult::Verified { .. } if !posture.healthy => Verdict::deny(
                DenialKind::PostureUnhealthy,
                risk.tier.max(RiskTier::High),
                risk.score,
                posture.issues.clone(),
            ),
            IdentityResult::Verified { .. } if risk.score > self.block_above => Verdict::deny(
                DenialKind::RiskExceeded,
                risk.tier,
                risk.score,
                vec![REASON_RISK_EXCEEDED.to_string()],
            ),
            IdentityResult::Verified { .. } => Verdict::allow(risk),
        };

        debug!(
            subject = %identity.subject(),
            allowed = verdict.allowed,
            tier = ?verdict.tier,
            score = verdict.score,
            "Decision reached"
        );
        verdict
    }
}

impl Default for DecisionEngine {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCK_ABOVE)
    }
}
