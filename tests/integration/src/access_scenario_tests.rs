//! Request-to-block scenarios through the full gate

use crate::test_utils::*;
use ztgate_core::{DenialKind, IdentityResult, IpReputation, OsTier, Outcome, RiskTier};

#[test]
fn test_healthy_request_is_allowed_and_sealed() {
    init_tracing();
    let (gate, store) = memory_gate();

    let verdict = gate
        .evaluate(&request(
            verified("alice", "user"),
            healthy_posture(),
            "GET /api/secure/reports",
            14,
        ))
        .unwrap();

    assert!(verdict.allowed);
    assert_eq!(verdict.score, 0);
    assert_eq!(verdict.tier, RiskTier::Low);
    assert_eq!(verdict.reasons, vec!["All checks passed".to_string()]);

    let blocks = store.snapshot();
    assert_eq!(blocks.len(), 2);
    let entry = blocks[1].entry().unwrap();
    assert_eq!(entry.subject, "alice");
    assert_eq!(entry.outcome, Outcome::Granted);
    assert_eq!(entry.tier, RiskTier::Low);
    assert_eq!(blocks[1].previous_hash, blocks[0].hash);
    assert!(blocks[1].hash.starts_with("00"));
}

#[test]
fn test_disabled_antivirus_is_denied_and_sealed() {
    init_tracing();
    let (gate, store) = memory_gate();

    let mut posture = healthy_posture();
    posture.antivirus_active = false;

    let verdict = gate
        .evaluate(&request(verified("bob", "user"), posture, "view-report", 14))
        .unwrap();

    assert!(!verdict.allowed);
    assert_eq!(verdict.reasons, vec!["Antivirus Disabled".to_string()]);
    assert!(verdict.tier >= RiskTier::High);
    assert_eq!(verdict.denial, Some(DenialKind::PostureUnhealthy));

    let entry = store.snapshot()[1].entry().cloned().unwrap();
    assert_eq!(entry.outcome, Outcome::Denied);
    assert_eq!(entry.reasons, verdict.reasons);
    assert!(!entry.posture.antivirus_active);
}

#[test]
fn test_admin_action_by_user_scores_high_but_passes() {
    init_tracing();
    let (gate, store) = memory_gate();

    let verdict = gate
        .evaluate(&request(
            verified("carol", "user"),
            healthy_posture(),
            "admin-panel",
            14,
        ))
        .unwrap();

    assert!(verdict.allowed);
    assert_eq!(verdict.score, 50);
    assert_eq!(verdict.tier, RiskTier::High);

    let entry = store.snapshot()[1].entry().cloned().unwrap();
    assert_eq!(entry.outcome, Outcome::Granted);
    assert_eq!(entry.score, 50);
}

#[test]
fn test_stacked_risk_is_denied() {
    let (gate, _) = memory_gate();

    let mut posture = healthy_posture();
    posture.geo_tag = "Unknown".to_string();

    // 30 (geo) + 20 (late night) + 50 (escalation)
    let verdict = gate
        .evaluate(&request(verified("dave", "user"), posture, "admin-panel", 3))
        .unwrap();

    assert!(!verdict.allowed);
    assert_eq!(verdict.score, 100);
    assert_eq!(verdict.tier, RiskTier::Critical);
    assert_eq!(verdict.reasons, vec!["Risk Threshold Exceeded".to_string()]);
}

#[test]
fn test_every_posture_issue_is_reported_in_order() {
    let (gate, _) = memory_gate();

    let mut posture = healthy_posture();
    posture.antivirus_active = false;
    posture.os_tier = OsTier::Outdated;
    posture.ip_reputation = IpReputation::Bad;

    let verdict = gate
        .evaluate(&request(verified("erin", "user"), posture, "view-report", 14))
        .unwrap();

    assert_eq!(
        verdict.reasons,
        vec![
            "Antivirus Disabled".to_string(),
            "OS Outdated".to_string(),
            "Suspicious IP".to_string(),
        ]
    );
}

#[test]
fn test_identity_failures_are_sealed() {
    let (gate, store) = memory_gate();

    let missing = gate
        .evaluate(&request(
            IdentityResult::Missing,
            healthy_posture(),
            "view-report",
            14,
        ))
        .unwrap();
    let invalid = gate
        .evaluate(&request(
            IdentityResult::Invalid,
            healthy_posture(),
            "view-report",
            14,
        ))
        .unwrap();

    assert_eq!(missing.reasons, vec!["No Token".to_string()]);
    assert_eq!(missing.tier, RiskTier::Critical);
    assert_eq!(invalid.reasons, vec!["Invalid Token".to_string()]);
    assert_eq!(invalid.tier, RiskTier::High);

    let blocks = store.snapshot();
    assert_eq!(blocks.len(), 3);
    for block in &blocks[1..] {
        let entry = block.entry().unwrap();
        assert_eq!(entry.subject, "Unknown");
        assert_eq!(entry.outcome, Outcome::Denied);
    }
}

#[test]
fn test_posture_decoded_from_header_json() {
    let (gate, _) = memory_gate();
    let posture = ztgate_core::PostureSnapshot::from_json(
        r#"{"antivirusActive":true,"osTier":"Outdated","ipReputation":"Good","geoTag":"EU"}"#,
    )
    .unwrap();

    let verdict = gate
        .evaluate(&request(verified("frank", "user"), posture, "view-report", 10))
        .unwrap();
    assert_eq!(verdict.reasons, vec!["OS Outdated".to_string()]);
}
