//! Structural block validation, run on a dedicated worker thread fed by
//! the ingress queue (spec §2 workspace layout: "validation callback
//! thread"). Composes `hive-consensus`'s context-free checks; contextual
//! checks (best-chain work comparison, UTXO spend validity) stay inside
//! `hive_state::State::commit_block`, matching the teacher's division
//! of labor between `zebra-consensus` and `zebra-state`.

use chrono::{DateTime, Utc};

use hive_chain::block::Block;
use hive_chain::parameters::Network;
use hive_consensus::block::check;

use crate::error::NodeError;

/// Runs every context-free structural check against `block`, in the
/// order the teacher's `zebra-consensus` block verifier runs them.
pub fn validate_block(block: &Block, network: Network, now: DateTime<Utc>) -> Result<(), NodeError> {
    check::coinbase_is_first(block)?;

    let height = block
        .coinbase_height()
        .ok_or_else(|| NodeError::StateCommit("block has no coinbase height".to_string()))?;
    let hash = block.hash();

    check::difficulty_is_valid(&block.header, network, &height, &hash)?;
    check::time_is_valid_at(&block.header, now, &height, &hash)
        .map_err(|err| NodeError::StateCommit(err.to_string()))?;

    let transaction_hashes: Vec<_> = block.transactions.iter().map(|tx| tx.hash()).collect();
    check::merkle_root_validity(block, &transaction_hashes)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_a_block_with_no_transactions() {
        hive_test::init();
        let block = Block {
            header: hive_chain::block::Header::new(
                1,
                hive_chain::block::Hash([0; 32]),
                hive_chain::block::merkle::Root([0; 32]),
                Utc::now(),
                hive_chain::work::difficulty::CompactDifficulty(0x1d00_ffff),
                0,
            ),
            transactions: vec![],
        };

        let result = validate_block(&block, Network::Mainnet, Utc::now());
        assert!(result.is_err());
    }
}
