//! Configuration management for ZTGate.
//!
//! Scoring weights and ledger sealing limits live here so that every
//! boundary (score 60 vs 61, tier cut-offs, difficulty) is read from one
//! named structure instead of literals scattered through the pipeline.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub risk: RiskWeights,
    pub ledger: LedgerConfig,
    pub logging: LoggingConfig,
}

/// Weights and thresholds for additive risk scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskWeights {
    /// Added when the posture geo tag equals `unknown_geo_tag`
    pub unknown_geo_weight: u32,
    pub unknown_geo_tag: String,
    /// Added when the request hour is before `late_night_before_hour`
    pub late_night_weight: u32,
    pub late_night_before_hour: u8,
    /// Added when the action mentions `admin_action_marker` and the
    /// subject role is not `admin_role`
    pub admin_escalation_weight: u32,
    pub admin_action_marker: String,
    pub admin_role: String,
    /// Tier cut-offs; a score strictly above each value reaches that tier
    pub medium_above: u32,
    pub high_above: u32,
    pub critical_above: u32,
    /// Scores strictly above this are denied
    pub block_above: u32,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            unknown_geo_weight: 30,
            unknown_geo_tag: "Unknown".to_string(),
            late_night_weight: 20,
            late_night_before_hour: 6,
            admin_escalation_weight: 50,
            admin_action_marker: "admin".to_string(),
            admin_role: "admin".to_string(),
            medium_above: 20,
            high_above: 40,
            critical_above: 70,
            block_above: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Required number of leading zero hex nibbles in a sealed block hash
    pub difficulty: usize,
    /// Upper bound on nonces tried before giving up with a seal timeout
    pub max_nonce: u64,
    /// Wall-clock bound on a single seal search
    pub seal_timeout_ms: u64,
    pub db_path: PathBuf,
    pub node_id: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            difficulty: 2,
            max_nonce: 5_000_000,
            seal_timeout_ms: 2_000,
            db_path: PathBuf::from("data/ledger.db"),
            node_id: "ztgate-node".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let risk = &self.risk;
        if !(risk.medium_above < risk.high_above && risk.high_above < risk.critical_above) {
            return Err(Error::Config(format!(
                "tier thresholds must be strictly increasing: medium={} high={} critical={}",
                risk.medium_above, risk.high_above, risk.critical_above
            )));
        }
        if risk.late_night_before_hour > 24 {
            return Err(Error::Config(format!(
                "late_night_before_hour must be <= 24, got {}",
                risk.late_night_before_hour
            )));
        }
        // SHA-256 hex digests have 64 nibbles
        if self.ledger.difficulty > 64 {
            return Err(Error::Config(format!(
                "difficulty must be <= 64, got {}",
                self.ledger.difficulty
            )));
        }
        if self.ledger.max_nonce == 0 {
            return Err(Error::Config("max_nonce must be positive".to_string()));
        }
        Ok(())
    }
}
