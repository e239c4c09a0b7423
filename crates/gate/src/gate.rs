//! Trust gate - the per-request entry point
//!
//! Every evaluation follows the same path:
//! posture → risk → decision → ledger append → verdict.
//! A verdict is only returned once its ledger entry is durably sealed.

use crate::error::{GateError, Result};
use crate::query::LedgerQuery;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use ztgate_core::{Config, IdentityResult, PostureSnapshot, RiskContext, RiskWeights, Verdict};
use ztgate_ledger::{current_timestamp_ms, AuditLedger, BlockStore, LedgerEntry};
use ztgate_policy::{DecisionEngine, PostureEvaluator, RiskScorer};

/// One access request as handed over by the transport layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRequest {
    pub identity: IdentityResult,
    pub posture: PostureSnapshot,
    /// Requested action, e.g. "GET /api/secure/reports"
    pub action: String,
    /// Local hour of the request, 0..=23
    pub hour: u8,
}

impl AccessRequest {
    fn risk_context(&self) -> RiskContext {
        RiskContext {
            hour: self.hour,
            requested_action: self.action.clone(),
            subject_role: self.identity.role().to_string(),
            posture: self.posture.clone(),
        }
    }
}

pub struct TrustGate<S: BlockStore> {
    posture: PostureEvaluator,
    scorer: RiskScorer,
    engine: DecisionEngine,
    ledger: Arc<AuditLedger<S>>,
}

impl<S: BlockStore> TrustGate<S> {
    pub fn new(weights: RiskWeights, ledger: Arc<AuditLedger<S>>) -> Self {
        Self {
            posture: PostureEvaluator::new(),
            engine: DecisionEngine::from_weights(&weights),
            scorer: RiskScorer::new(weights),
            ledger,
        }
    }

    pub fn from_config(config: &Config, ledger: Arc<AuditLedger<S>>) -> Self {
        Self::new(config.risk.clone(), ledger)
    }

    /// Evaluate a request and record the verdict.
    ///
    /// Invalid input is rejected without a ledger entry. Every other
    /// outcome, allow or deny, is appended before it is returned; if the
    /// append fails the error is returned instead of the verdict.
    pub fn evaluate(&self, request: &AccessRequest) -> Result<Verdict> {
        let context = request.risk_context();
        context.validate()?;

        let report = self.posture.evaluate(&request.posture);
        let assessment = self.scorer.score(&context);
        let verdict = self.engine.decide(&request.identity, &report, &assessment);

        let entry = LedgerEntry::from_verdict(
            request.identity.subject(),
            request.action.as_str(),
            request.posture.clone(),
            &verdict,
            current_timestamp_ms(),
        );
        let block = self.ledger.append(entry).map_err(GateError::from)?;

        if verdict.allowed {
            info!(
                subject = %request.identity.subject(),
                action = %request.action,
                tier = ?verdict.tier,
                score = verdict.score,
                block_index = block.index,
                "Access granted"
            );
        } else {
            warn!(
                subject = %request.identity.subject(),
                action = %request.action,
                tier = ?verdict.tier,
                score = verdict.score,
                reasons = %verdict.summary(),
                block_index = block.index,
                "Access denied"
            );
        }

        Ok(verdict)
    }

    /// Read-only view of the ledger. Queries never append.
    pub fn query(&self) -> LedgerQuery<S> {
        LedgerQuery::new(Arc::clone(&self.ledger))
    }

    pub fn ledger(&self) -> &Arc<AuditLedger<S>> {
        &self.ledger
    }
}
