//! Chain integrity from genesis through tampering

use crate::test_utils::*;
use ztgate_core::LedgerConfig;
use ztgate_ledger::{
    AuditLedger, LedgerError, LedgerHealth, MemoryBlockStore, SqliteBlockStore, GENESIS_MESSAGE,
};

fn allow_n(gate: &ztgate_gate::TrustGate<impl ztgate_ledger::BlockStore>, n: usize) {
    for i in 0..n {
        gate.evaluate(&request(
            verified(&format!("user-{}", i), "user"),
            healthy_posture(),
            "view-report",
            12,
        ))
        .unwrap();
    }
}

#[test]
fn test_genesis_then_first_append() {
    init_tracing();
    let (gate, store) = memory_gate();

    let blocks = store.snapshot();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].index, 0);
    assert_eq!(blocks[0].previous_hash, "0");
    assert_eq!(blocks[0].nonce, 0);
    assert_eq!(
        serde_json::to_value(&blocks[0].payload).unwrap(),
        serde_json::json!({ "message": GENESIS_MESSAGE })
    );

    allow_n(&gate, 1);

    let verification = gate.ledger().verify().unwrap();
    assert!(verification.valid);
    assert_eq!(verification.blocks_checked, 2);
    assert_eq!(gate.ledger().len().unwrap(), 2);
}

#[test]
fn test_tampered_entry_reported_at_its_index() {
    let (gate, store) = memory_gate();
    allow_n(&gate, 5);

    assert!(store.tamper(3, |block| {
        if let ztgate_ledger::BlockPayload::Entry(entry) = &mut block.payload {
            entry.subject = "mallory".to_string();
        }
    }));

    let result = gate.ledger().verify_persisted().unwrap();
    assert!(!result.valid);
    assert_eq!(result.first_invalid_index, Some(3));
    assert_eq!(result.error.as_deref(), Some("Block 3 hash invalid"));

    // The committed snapshot was never touched
    assert!(gate.ledger().verify().unwrap().valid);
}

#[test]
fn test_resealed_block_breaks_next_link() {
    let (gate, store) = memory_gate();
    allow_n(&gate, 4);

    store.tamper(2, |block| {
        block.timestamp += 1;
        block.hash = block.recompute_hash().unwrap();
    });

    let result = gate.ledger().verify_persisted().unwrap();
    assert!(!result.valid);
    assert!(matches!(result.first_invalid_index, Some(2) | Some(3)));
}

#[test]
fn test_reopen_after_tamper_refuses_appends() {
    let store = MemoryBlockStore::new();
    let gate = gate_over(store.clone(), &LedgerConfig::default());
    allow_n(&gate, 3);
    drop(gate);

    store.tamper(1, |block| block.nonce += 1);

    let ledger = AuditLedger::open(store.clone(), &LedgerConfig::default()).unwrap();
    assert_eq!(
        ledger.health().unwrap(),
        LedgerHealth::Corrupted {
            first_invalid_index: 1,
            reason: "Block 1 hash invalid".to_string(),
        }
    );

    let gate = ztgate_gate::TrustGate::new(Default::default(), std::sync::Arc::new(ledger));
    let err = gate
        .evaluate(&request(
            verified("alice", "user"),
            healthy_posture(),
            "view-report",
            12,
        ))
        .unwrap_err();
    assert!(err.is_service_unavailable());
    assert!(matches!(
        err,
        ztgate_gate::GateError::Ledger(LedgerError::Corrupted { .. })
    ));
    assert_eq!(store.snapshot().len(), 4);
}

#[test]
fn test_sqlite_chain_survives_restart() {
    let db = TempDb::new();
    let config = LedgerConfig {
        db_path: db.path.clone(),
        ..LedgerConfig::default()
    };

    {
        let gate = gate_over(SqliteBlockStore::open(&db.path).unwrap(), &config);
        allow_n(&gate, 3);
    }

    let gate = gate_over(SqliteBlockStore::open(&db.path).unwrap(), &config);
    assert_eq!(gate.ledger().len().unwrap(), 4);
    assert!(gate.ledger().health().unwrap().is_ok());

    allow_n(&gate, 1);
    let latest = gate.ledger().latest().unwrap();
    assert_eq!(latest.index, 4);
    assert!(gate.ledger().verify_persisted().unwrap().valid);
}

#[test]
fn test_sqlite_tamper_at_rest_detected() {
    let db = TempDb::new();
    let gate = gate_over(
        SqliteBlockStore::open(&db.path).unwrap(),
        &LedgerConfig::default(),
    );
    allow_n(&gate, 4);

    // Second connection edits the row behind the ledger's back
    let intruder = SqliteBlockStore::open(&db.path).unwrap();
    let changed = intruder
        .__test_execute_raw_sql("UPDATE ledger_blocks SET nonce = nonce + 1 WHERE idx = 2", &[])
        .unwrap();
    assert_eq!(changed, 1);

    let result = gate.ledger().verify_persisted().unwrap();
    assert!(!result.valid);
    assert_eq!(result.first_invalid_index, Some(2));
    assert_eq!(gate.ledger().metrics().corruption_detections_total, 1);
}

#[test]
fn test_sqlite_injected_payload_key_detected() {
    let db = TempDb::new();
    let gate = gate_over(
        SqliteBlockStore::open(&db.path).unwrap(),
        &LedgerConfig::default(),
    );
    allow_n(&gate, 3);

    let intruder = SqliteBlockStore::open(&db.path).unwrap();
    intruder
        .__test_execute_raw_sql(
            r#"UPDATE ledger_blocks SET payload = replace(payload, '{"subject"', '{"override":"GRANTED_BY_ADMIN","subject"') WHERE idx = 2"#,
            &[],
        )
        .unwrap();

    let result = gate.ledger().verify_persisted().unwrap();
    assert!(!result.valid);
    assert_eq!(result.first_invalid_index, Some(2));
    assert_eq!(result.error.as_deref(), Some("Block 2 payload unreadable"));
}

#[test]
fn test_sqlite_unknown_outcome_detected_and_reopens_corrupted() {
    let db = TempDb::new();
    {
        let gate = gate_over(
            SqliteBlockStore::open(&db.path).unwrap(),
            &LedgerConfig::default(),
        );
        allow_n(&gate, 3);

        let intruder = SqliteBlockStore::open(&db.path).unwrap();
        intruder
            .__test_execute_raw_sql(
                r#"UPDATE ledger_blocks SET payload = replace(payload, '"Granted"', '"Revoked"') WHERE idx = 2"#,
                &[],
            )
            .unwrap();

        let result = gate.ledger().verify_persisted().unwrap();
        assert_eq!(result.first_invalid_index, Some(2));
    }

    let ledger = AuditLedger::open(
        SqliteBlockStore::open(&db.path).unwrap(),
        &LedgerConfig::default(),
    )
    .unwrap();
    assert_eq!(
        ledger.health().unwrap(),
        LedgerHealth::Corrupted {
            first_invalid_index: 2,
            reason: "Block 2 payload unreadable".to_string(),
        }
    );
    // Still inspectable
    assert_eq!(ledger.len().unwrap(), 4);
    assert_eq!(ledger.recent_entries(10).unwrap().len(), 2);
}
