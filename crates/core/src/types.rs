//! Shared data model for trust evaluation.
//!
//! These types flow between the policy crate (which produces verdicts), the
//! gate (which orchestrates a request) and the ledger (which records the
//! outcome). Serialized field names are part of the canonical block encoding
//! and must not be renamed.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Operating system patch tier reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OsTier {
    Current,
    Outdated,
}

/// Reputation of the source address as judged by the posture collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IpReputation {
    Good,
    Bad,
}

/// Point-in-time description of the requesting device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PostureSnapshot {
    pub antivirus_active: bool,
    pub os_tier: OsTier,
    pub ip_reputation: IpReputation,
    pub geo_tag: String,
}

/// Wire form of a posture snapshot where every field may be absent.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPosture {
    antivirus_active: Option<bool>,
    os_tier: Option<OsTier>,
    ip_reputation: Option<IpReputation>,
    geo_tag: Option<String>,
}

impl PostureSnapshot {
    /// Decode a posture snapshot from the collaborator's JSON form.
    ///
    /// Fails with [`Error::InvalidInput`] naming every missing field, or when
    /// the document is not valid JSON.
    pub fn from_json(raw: &str) -> Result<Self> {
        let raw: RawPosture = serde_json::from_str(raw)
            .map_err(|e| Error::InvalidInput(format!("malformed posture: {}", e)))?;
        Self::try_from_raw(raw)
    }

    /// Decode a posture snapshot from an already-parsed JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let raw: RawPosture = serde_json::from_value(value)
            .map_err(|e| Error::InvalidInput(format!("malformed posture: {}", e)))?;
        Self::try_from_raw(raw)
    }

    fn try_from_raw(raw: RawPosture) -> Result<Self> {
        let mut missing = Vec::new();
        if raw.antivirus_active.is_none() {
            missing.push("antivirusActive");
        }
        if raw.os_tier.is_none() {
            missing.push("osTier");
        }
        if raw.ip_reputation.is_none() {
            missing.push("ipReputation");
        }
        if raw.geo_tag.is_none() {
            missing.push("geoTag");
        }

        match (raw.antivirus_active, raw.os_tier, raw.ip_reputation, raw.geo_tag) {
            (Some(antivirus_active), Some(os_tier), Some(ip_reputation), Some(geo_tag)) => {
                Ok(Self {
                    antivirus_active,
                    os_tier,
                    ip_reputation,
                    geo_tag,
                })
            }
            _ => Err(Error::InvalidInput(format!(
                "posture missing required fields: {}",
                missing.join(", ")
            ))),
        }
    }
}

/// Coarse, ordered risk classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskTier {
    Low,
    Medium,
    High,
    Critical,
}

/// Numeric risk score plus the tier it maps to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub score: u32,
    pub tier: RiskTier,
    /// Weighted rules that contributed to the score, in evaluation order
    pub factors: Vec<String>,
}

/// Identity as established by the external token verifier.
///
/// The core never validates tokens itself; it only consumes this result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IdentityResult {
    /// No credential was presented
    Missing,
    /// A credential was presented but failed verification
    Invalid,
    /// Verified subject and role
    Verified { subject_id: String, role: String },
}

impl IdentityResult {
    /// Build a result from the collaborator's `{subjectId, role, valid}` triple.
    pub fn from_claim(subject_id: impl Into<String>, role: impl Into<String>, valid: bool) -> Self {
        if valid {
            IdentityResult::Verified {
                subject_id: subject_id.into(),
                role: role.into(),
            }
        } else {
            IdentityResult::Invalid
        }
    }

    pub fn is_verified(&self) -> bool {
        matches!(self, IdentityResult::Verified { .. })
    }

    /// Subject recorded in the ledger. Unverified callers are "Unknown".
    pub fn subject(&self) -> &str {
        match self {
            IdentityResult::Verified { subject_id, .. } => subject_id,
            _ => "Unknown",
        }
    }

    /// Role used for risk scoring. Unverified callers have no role.
    pub fn role(&self) -> &str {
        match self {
            IdentityResult::Verified { role, .. } => role,
            _ => "",
        }
    }
}

/// Request context consumed by the risk scorer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskContext {
    /// Local hour of the request, 0..=23
    pub hour: u8,
    pub requested_action: String,
    pub subject_role: String,
    pub posture: PostureSnapshot,
}

impl RiskContext {
    pub fn validate(&self) -> Result<()> {
        if self.hour > 23 {
            return Err(Error::InvalidInput(format!(
                "hour must be in 0..=23, got {}",
                self.hour
            )));
        }
        if self.requested_action.trim().is_empty() {
            return Err(Error::InvalidInput(
                "requested action cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Why a request was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DenialKind {
    IdentityInvalid,
    PostureUnhealthy,
    RiskExceeded,
}

/// Allow/Deny outcome of one trust evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub allowed: bool,
    pub tier: RiskTier,
    pub score: u32,
    pub reasons: Vec<String>,
    pub denial: Option<DenialKind>,
}

impl Verdict {
    pub fn allow(assessment: &RiskAssessment) -> Self {
        Self {
            allowed: true,
            tier: assessment.tier,
            score: assessment.score,
            reasons: vec!["All checks passed".to_string()],
            denial: None,
        }
    }

    pub fn deny(kind: DenialKind, tier: RiskTier, score: u32, reasons: Vec<String>) -> Self {
        Self {
            allowed: false,
            tier,
            score,
            reasons,
            denial: Some(kind),
        }
    }

    pub fn outcome(&self) -> Outcome {
        if self.allowed {
            Outcome::Granted
        } else {
            Outcome::Denied
        }
    }

    /// Reasons joined for display, e.g. "Antivirus Disabled, OS Outdated".
    pub fn summary(&self) -> String {
        self.reasons.join(", ")
    }
}

/// Recorded outcome of an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Granted,
    Denied,
}
