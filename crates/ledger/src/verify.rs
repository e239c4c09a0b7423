//! Chain verification.

use crate::block::{meets_difficulty, Block, GENESIS_PREVIOUS_HASH};
use serde::{Deserialize, Serialize};

/// Result of walking a chain in index order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainVerification {
    pub valid: bool,
    /// Index of the first block that failed a check
    pub first_invalid_index: Option<u64>,
    /// What failed at `first_invalid_index`
    pub error: Option<String>,
    pub blocks_checked: usize,
}

impl ChainVerification {
    fn ok(blocks_checked: usize) -> Self {
        Self {
            valid: true,
            first_invalid_index: None,
            error: None,
            blocks_checked,
        }
    }

    fn failed(index: u64, error: String, blocks_checked: usize) -> Self {
        Self {
            valid: false,
            first_invalid_index: Some(index),
            error: Some(error),
            blocks_checked,
        }
    }
}

/// Verify a chain that is expected to start at the genesis block.
///
/// For each block, in order: its index matches its position, its payload
/// decoded from storage, its stored hash matches the recomputed hash, its `previous_hash` matches the prior
/// block's hash (or the genesis sentinel), and non-genesis hashes meet
/// `difficulty`. An empty chain is valid.
pub fn verify_chain(blocks: &[Block], difficulty: usize) -> ChainVerification {
    for (position, block) in blocks.iter().enumerate() {
        let checked = position + 1;
        let expected_index = position as u64;

        if block.index != expected_index {
            return ChainVerification::failed(
                expected_index,
                format!("Block {} index out of sequence", block.index),
                checked,
            );
        }

        if !block.payload.is_readable() {
            return ChainVerification::failed(
                block.index,
                format!("Block {} payload unreadable", block.index),
                checked,
            );
        }

        match block.recompute_hash() {
            Ok(recomputed) if recomputed == block.hash => {}
            _ => {
                return ChainVerification::failed(
                    block.index,
                    format!("Block {} hash invalid", block.index),
                    checked,
                );
            }
        }

        let expected_previous = match position {
            0 => GENESIS_PREVIOUS_HASH,
            _ => blocks[position - 1].hash.as_str(),
        };
        if block.previous_hash != expected_previous {
            return ChainVerification::failed(
                block.index,
                format!("Block {} broken link to previous", block.index),
                checked,
            );
        }

        if position > 0 && !meets_difficulty(&block.hash, difficulty) {
            return ChainVerification::failed(
                block.index,
                format!("Block {} does not meet difficulty", block.index),
                checked,
            );
        }
    }

    ChainVerification::ok(blocks.len())
}
