//! Shared fixtures for integration tests

use std::path::PathBuf;
use std::sync::Arc;
use ztgate_core::{
    IdentityResult, IpReputation, LedgerConfig, OsTier, PostureSnapshot, RiskWeights,
};
use ztgate_gate::{AccessRequest, TrustGate};
use ztgate_ledger::{AuditLedger, BlockStore, MemoryBlockStore};

/// Initialize tracing once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Posture with every check passing.
pub fn healthy_posture() -> PostureSnapshot {
    PostureSnapshot {
        antivirus_active: true,
        os_tier: OsTier::Current,
        ip_reputation: IpReputation::Good,
        geo_tag: "US-West".to_string(),
    }
}

pub fn verified(subject: &str, role: &str) -> IdentityResult {
    IdentityResult::from_claim(subject, role, true)
}

pub fn request(
    identity: IdentityResult,
    posture: PostureSnapshot,
    action: &str,
    hour: u8,
) -> AccessRequest {
    AccessRequest {
        identity,
        posture,
        action: action.to_string(),
        hour,
    }
}

/// Gate over an in-memory store; the store handle shares state with the
/// ledger so tests can inspect or tamper with persisted blocks.
pub fn memory_gate() -> (TrustGate<MemoryBlockStore>, MemoryBlockStore) {
    let store = MemoryBlockStore::new();
    let gate = gate_over(store.clone(), &LedgerConfig::default());
    (gate, store)
}

pub fn gate_over<S: BlockStore>(store: S, config: &LedgerConfig) -> TrustGate<S> {
    let ledger = AuditLedger::open(store, config).expect("ledger opens");
    TrustGate::new(RiskWeights::default(), Arc::new(ledger))
}

/// Temporary SQLite path removed (with WAL side files) on drop.
pub struct TempDb {
    pub path: PathBuf,
}

impl TempDb {
    pub fn new() -> Self {
        let path = std::env::temp_dir().join(format!("ztgate-it-{}.db", uuid::Uuid::new_v4()));
        Self { path }
    }
}

impl Default for TempDb {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TempDb {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let mut os = self.path.clone().into_os_string();
            os.push(suffix);
            let _ = std::fs::remove_file(PathBuf::from(os));
        }
    }
}
