//! ZTGate node
//!
//! Wires configuration, the SQLite block store and the trust gate together
//! for one-shot use from the command line:
//!
//! ```text
//! ztgate-node [--config <file>] evaluate <request.json>
//! ztgate-node [--config <file>] verify
//! ztgate-node [--config <file>] chain [--limit N]
//! ztgate-node --version-json
//! ```

use anyhow::{anyhow, bail, Context, Result};
use chrono::Timelike;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tracing::error;
use ztgate_core::{logging, Config, IdentityResult, PostureSnapshot, Verdict};
use ztgate_gate::{AccessRequest, GateError, TrustGate, DEFAULT_CHAIN_LIMIT};
use ztgate_ledger::{AuditLedger, LedgerError, SqliteBlockStore};

const NODE_PROTOCOL_VERSION: u32 = 1;
const LEDGER_FORMAT_VERSION: u32 = 1;

const EXIT_OK: i32 = 0;
const EXIT_FAILURE: i32 = 1;
const EXIT_UNAVAILABLE: i32 = 3;

/// Subject recorded for ledger reads issued from this binary.
const LOCAL_OPERATOR: &str = "local-operator";

#[derive(Debug, Serialize)]
struct NodeVersionHandshake {
    version: &'static str,
    protocol_version: u32,
    ledger_format_version: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Evaluate(PathBuf),
    Verify,
    Chain { limit: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Invocation {
    config: Option<PathBuf>,
    operator: String,
    command: Command,
}

/// Identity triple as produced by the token verifier.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityClaim {
    subject_id: String,
    role: String,
    valid: bool,
}

/// On-disk request format; `identity: null` means no credential.
#[derive(Debug, Deserialize)]
struct RequestFile {
    #[serde(default)]
    identity: Option<IdentityClaim>,
    posture: serde_json::Value,
    action: String,
    #[serde(default)]
    hour: Option<u8>,
}

impl RequestFile {
    fn into_request(self, default_hour: u8) -> Result<AccessRequest> {
        let identity = match self.identity {
            None => IdentityResult::Missing,
            Some(claim) => IdentityResult::from_claim(claim.subject_id, claim.role, claim.valid),
        };
        let posture = PostureSnapshot::from_value(self.posture)?;
        Ok(AccessRequest {
            identity,
            posture,
            action: self.action,
            hour: self.hour.unwrap_or(default_hour),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EvaluateOutput<'a> {
    verdict: &'a Verdict,
    block_count: usize,
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|arg| arg == "--version-json") {
        let handshake = NodeVersionHandshake {
            version: env!("CARGO_PKG_VERSION"),
            protocol_version: NODE_PROTOCOL_VERSION,
            ledger_format_version: LEDGER_FORMAT_VERSION,
        };
        match serde_json::to_string(&handshake) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: {}", e);
                process::exit(EXIT_FAILURE);
            }
        }
        return;
    }

    if args.is_empty() || args.iter().any(|arg| arg == "--help" || arg == "-h") {
        print_usage();
        return;
    }

    let code = match parse_args(&args).and_then(run) {
        Ok(code) => code,
        Err(e) => {
            let unavailable = e
                .downcast_ref::<GateError>()
                .map(GateError::is_service_unavailable)
                .unwrap_or(false);
            error!(error = %e, "ztgate-node command failed");
            eprintln!("Error: {:#}", e);
            if unavailable {
                EXIT_UNAVAILABLE
            } else {
                EXIT_FAILURE
            }
        }
    };
    process::exit(code);
}

fn run(invocation: Invocation) -> Result<i32> {
    let config = load_config(invocation.config.as_deref())?;
    logging::init_from_config(&config.logging);

    let store = SqliteBlockStore::open(&config.ledger.db_path)
        .map_err(|e| GateError::from(LedgerError::Storage(e)))
        .with_context(|| format!("opening ledger at {}", config.ledger.db_path.display()))?;
    let ledger = AuditLedger::open(store, &config.ledger).map_err(GateError::from)?;
    let gate = TrustGate::from_config(&config, Arc::new(ledger));
    let operator = IdentityResult::from_claim(invocation.operator, "operator", true);

    match invocation.command {
        Command::Evaluate(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("reading request {}", path.display()))?;
            let file: RequestFile = serde_json::from_str(&raw)
                .with_context(|| format!("parsing request {}", path.display()))?;
            let request = file.into_request(local_hour())?;

            let verdict = gate.evaluate(&request)?;
            let output = EvaluateOutput {
                verdict: &verdict,
                block_count: gate.ledger().len().map_err(GateError::from)?,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(EXIT_OK)
        }
        Command::Verify => {
            let verification = gate.query().verify(&operator)?;
            println!("{}", serde_json::to_string_pretty(&verification)?);
            Ok(if verification.valid {
                EXIT_OK
            } else {
                EXIT_FAILURE
            })
        }
        Command::Chain { limit } => {
            let blocks = gate.query().chain(&operator, limit)?;
            println!("{}", serde_json::to_string_pretty(&blocks)?);
            Ok(EXIT_OK)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(Config::default()),
    }
}

fn local_hour() -> u8 {
    chrono::Local::now().hour() as u8
}

fn parse_args(args: &[String]) -> Result<Invocation> {
    let mut config = None;
    let mut operator = LOCAL_OPERATOR.to_string();
    let mut limit = DEFAULT_CHAIN_LIMIT;
    let mut positional = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let path = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config was provided without a path"))?;
                config = Some(PathBuf::from(path));
            }
            "--operator" => {
                operator = iter
                    .next()
                    .ok_or_else(|| anyhow!("--operator was provided without a name"))?
                    .clone();
            }
            "--limit" => {
                let raw = iter
                    .next()
                    .ok_or_else(|| anyhow!("--limit was provided without a value"))?;
                limit = raw
                    .parse()
                    .with_context(|| format!("invalid --limit value: {}", raw))?;
            }
            other if other.starts_with("--") => bail!("unknown option: {}", other),
            other => positional.push(other),
        }
    }

    let command = match positional.as_slice() {
        ["evaluate", path] => Command::Evaluate(PathBuf::from(*path)),
        ["evaluate"] => bail!("evaluate requires a request file"),
        ["verify"] => Command::Verify,
        ["chain"] => Command::Chain { limit },
        [] => bail!("missing command"),
        ["evaluate" | "verify" | "chain", ..] => {
            bail!("unexpected arguments: {}", positional.join(" "))
        }
        [other, ..] => bail!("unknown command: {}", other),
    };

    Ok(Invocation {
        config,
        operator,
        command,
    })
}

fn print_usage() {
    println!("ZTGate node - zero-trust access gate with a tamper-evident audit ledger");
    println!();
    println!("USAGE:");
    println!("    ztgate-node [--config <file>] evaluate <request.json>");
    println!("    ztgate-node [--config <file>] [--operator <name>] verify");
    println!("    ztgate-node [--config <file>] [--operator <name>] chain [--limit N]");
    println!("    ztgate-node --version-json");
    println!();
    println!("EXIT CODES:");
    println!("    0    verdict recorded (allow or deny), or chain valid");
    println!("    1    invalid input, invalid chain or other failure");
    println!("    3    audit ledger unavailable");
}
