//! Concurrent evaluations must produce a gap-free, valid chain

use crate::test_utils::*;
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use ztgate_core::LedgerConfig;
use ztgate_ledger::SqliteBlockStore;

const WORKERS: usize = 8;
const REQUESTS_PER_WORKER: usize = 4;

fn assert_gap_free(blocks: &[ztgate_ledger::Block], expected_len: usize) {
    assert_eq!(blocks.len(), expected_len);
    for (position, block) in blocks.iter().enumerate() {
        assert_eq!(block.index, position as u64);
        if position > 0 {
            assert_eq!(block.previous_hash, blocks[position - 1].hash);
        }
    }
    let hashes: HashSet<_> = blocks.iter().map(|b| b.hash.as_str()).collect();
    assert_eq!(hashes.len(), blocks.len());
}

#[test]
fn test_scoped_threads_append_without_gaps() {
    init_tracing();
    let (gate, store) = memory_gate();

    thread::scope(|scope| {
        for worker in 0..WORKERS {
            let gate = &gate;
            scope.spawn(move || {
                for n in 0..REQUESTS_PER_WORKER {
                    gate.evaluate(&request(
                        verified(&format!("worker-{}-{}", worker, n), "user"),
                        healthy_posture(),
                        "view-report",
                        12,
                    ))
                    .unwrap();
                }
            });
        }
    });

    let total = WORKERS * REQUESTS_PER_WORKER;
    let blocks = store.snapshot();
    assert_gap_free(&blocks, total + 1);
    assert_eq!(gate.ledger().snapshot().unwrap(), blocks);

    let verification = gate.ledger().verify_persisted().unwrap();
    assert!(verification.valid);
    assert_eq!(gate.ledger().metrics().blocks_appended_total, total as u64);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_blocking_tasks_append_without_gaps() {
    init_tracing();
    let (gate, store) = memory_gate();
    let gate = Arc::new(gate);

    let mut handles = Vec::new();
    for worker in 0..WORKERS {
        let gate = Arc::clone(&gate);
        handles.push(tokio::task::spawn_blocking(move || {
            gate.evaluate(&request(
                verified(&format!("task-{}", worker), "user"),
                healthy_posture(),
                "view-report",
                12,
            ))
        }));
    }

    for handle in handles {
        let verdict = handle.await.unwrap().unwrap();
        assert!(verdict.allowed);
    }

    assert_gap_free(&store.snapshot(), WORKERS + 1);
    assert!(gate.ledger().verify().unwrap().valid);
}

#[test]
fn test_concurrent_sqlite_appends_persist_in_order() {
    let db = TempDb::new();
    let gate = gate_over(
        SqliteBlockStore::open(&db.path).unwrap(),
        &LedgerConfig::default(),
    );

    thread::scope(|scope| {
        for worker in 0..WORKERS {
            let gate = &gate;
            scope.spawn(move || {
                gate.evaluate(&request(
                    verified(&format!("sql-{}", worker), "user"),
                    healthy_posture(),
                    "view-report",
                    12,
                ))
                .unwrap();
            });
        }
    });

    let reloaded = SqliteBlockStore::open(&db.path).unwrap();
    let blocks = ztgate_ledger::BlockStore::load(&reloaded).unwrap();
    assert_gap_free(&blocks, WORKERS + 1);
    assert!(gate.ledger().verify_persisted().unwrap().valid);
}
