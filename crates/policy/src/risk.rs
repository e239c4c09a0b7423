//! Additive risk scoring.
//!
//! Weights and tier cut-offs come from [`RiskWeights`]. With the defaults:
//!
//! | Rule | Weight |
//! |---|---|
//! | geo tag is "Unknown" | +30 |
//! | hour < 6 | +20 |
//! | action contains "admin" and role is not "admin" | +50 |
//!
//! Tiers: score > 70 Critical, > 40 High, > 20 Medium, else Low.

use ztgate_core::{RiskAssessment, RiskContext, RiskTier, RiskWeights};

pub const FACTOR_UNKNOWN_LOCATION: &str = "Unknown location";
pub const FACTOR_LATE_NIGHT: &str = "Late-night access";
pub const FACTOR_ADMIN_ESCALATION: &str = "Admin action without admin role";

#[derive(Debug, Clone, Default)]
pub struct RiskScorer {
    weights: RiskWeights,
}

impl RiskScorer {
    pub fn new(weights: RiskWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &RiskWeights {
        &self.weights
    }

    /// Score a request. Pure: identical contexts give identical results.
    pub fn score(&self, context: &RiskContext) -> RiskAssessment {
        let w = &self.weights;
        let mut score = 0u32;
        let mut factors = Vec::new();

        if context.posture.geo_tag == w.unknown_geo_tag {
            score = score.saturating_add(w.unknown_geo_weight);
            factors.push(FACTOR_UNKNOWN_LOCATION.to_string());
        }
        if context.hour < w.late_night_before_hour {
            score = score.saturating_add(w.late_night_weight);
            factors.push(FACTOR_LATE_NIGHT.to_string());
        }
        if context.requested_action.contains(w.admin_action_marker.as_str())
            && context.subject_role != w.admin_role
        {
            score = score.saturating_add(w.admin_escalation_weight);
            factors.push(FACTOR_ADMIN_ESCALATION.to_string());
        }

        RiskAssessment {
            score,
            tier: self.tier_for(score),
            factors,
        }
    }

    pub fn tier_for(&self, score: u32) -> RiskTier {
        let w = &self.weights;
        if score > w.critical_above {
            RiskTier::Critical
        } else if score > w.high_above {
            RiskTier::High
        } else if score > w.medium_above {
            RiskTier::Medium
        } else {
            RiskTier::Low
        }
    }
}
