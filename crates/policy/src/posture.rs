//! Device posture evaluation

use serde::{Deserialize, Serialize};
use ztgate_core::{IpReputation, OsTier, PostureSnapshot};

pub const ISSUE_ANTIVIRUS_DISABLED: &str = "Antivirus Disabled";
pub const ISSUE_OS_OUTDATED: &str = "OS Outdated";
pub const ISSUE_SUSPICIOUS_IP: &str = "Suspicious IP";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostureReport {
    pub healthy: bool,
    /// Issues in rule order: antivirus, OS, IP reputation
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PostureEvaluator;

impl PostureEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Classify a snapshot. Every rule is checked; issues accumulate.
    pub fn evaluate(&self, snapshot: &PostureSnapshot) -> PostureReport {
        let mut issues = Vec::new();

        if !snapshot.antivirus_active {
            issues.push(ISSUE_ANTIVIRUS_DISABLED.to_string());
        }
        if snapshot.os_tier == OsTier::Outdated {
            issues.push(ISSUE_OS_OUTDATED.to_string());
        }
        if snapshot.ip_reputation == IpReputation::Bad {
            issues.push(ISSUE_SUSPICIOUS_IP.to_string());
        }

        PostureReport {
            healthy: issues.is_empty(),
            issues,
        }
    }
}
