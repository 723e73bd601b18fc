//! Adapts `hive_state::State` to the narrow `ChainView` collaborator
//! traits `hive-miner`'s Block Assembler and Bee Search Coordinator need,
//! by walking the in-memory block index backwards from the tip via
//! `previous_block_hash`.

use std::sync::RwLock;

use chrono::{DateTime, Utc};

use hive_chain::block::{self, Height};
use hive_consensus::work::PastBlock;
use hive_state::{ChainTip, State};

/// A block is Hive-mined if its coinbase pays exactly two outputs: the
/// zero-value `OP_RETURN`/`OP_BEE` proof script followed by the honey
/// payout, matching `hive_miner::assembler::build_coinbase`'s convention.
fn is_hive_mined(block: &block::Block) -> bool {
    block
        .transactions
        .get(0)
        .map(|coinbase| coinbase.outputs.len() == 2)
        .unwrap_or(false)
}

pub struct ChainViewAdapter<'a> {
    state: &'a RwLock<State>,
}

impl<'a> ChainViewAdapter<'a> {
    pub fn new(state: &'a RwLock<State>) -> Self {
        ChainViewAdapter { state }
    }

    /// Walks backwards from the tip, yielding up to `count` blocks, most
    /// recent last.
    fn walk_back(&self, count: usize) -> Vec<block::Block> {
        let state = self.state.read().expect("chain state lock not poisoned");
        let mut out = Vec::with_capacity(count);
        let mut cursor = state.tip_hash();

        while out.len() < count {
            let hash = match cursor {
                Some(hash) => hash,
                None => break,
            };
            let block = match state.block_by_hash(&hash) {
                Some(block) => block,
                None => break,
            };
            cursor = Some(block.header.previous_block_hash);
            out.push((*block).clone());
        }

        out.reverse();
        out
    }
}

impl<'a> hive_miner::ChainView for ChainViewAdapter<'a> {
    fn tip_height(&self) -> Height {
        self.state
            .read()
            .expect("chain state lock not poisoned")
            .tip_height()
            .unwrap_or(Height(0))
    }

    fn tip_hash(&self) -> block::Hash {
        self.state
            .read()
            .expect("chain state lock not poisoned")
            .tip_hash()
            .unwrap_or(block::Hash([0; 32]))
    }

    fn median_time_past(&self) -> DateTime<Utc> {
        let mut times: Vec<DateTime<Utc>> = self
            .walk_back(11)
            .iter()
            .map(|block| block.header.time)
            .collect();
        times.sort();
        times.get(times.len() / 2).copied().unwrap_or_else(Utc::now)
    }

    fn recent_past_blocks(&self, count: usize) -> Vec<PastBlock> {
        self.walk_back(count)
            .iter()
            .filter_map(|block| {
                Some(PastBlock {
                    height: block.coinbase_height()?,
                    time: block.header.time,
                    difficulty_threshold: block.header.difficulty_threshold,
                })
            })
            .collect()
    }

    fn recent_hive_past_blocks(&self, count: usize) -> Vec<PastBlock> {
        let state = self.state.read().expect("chain state lock not poisoned");
        let mut out = Vec::with_capacity(count);
        let mut cursor = state.tip_hash();

        while out.len() < count {
            let hash = match cursor {
                Some(hash) => hash,
                None => break,
            };
            let block = match state.block_by_hash(&hash) {
                Some(block) => block,
                None => break,
            };
            cursor = Some(block.header.previous_block_hash);
            if is_hive_mined(&block) {
                if let Some(height) = block.coinbase_height() {
                    out.push(PastBlock {
                        height,
                        time: block.header.time,
                        difficulty_threshold: block.header.difficulty_threshold,
                    });
                }
            }
        }

        out.reverse();
        out
    }

    fn consecutive_hive_blocks_at_tip(&self) -> u32 {
        let state = self.state.read().expect("chain state lock not poisoned");
        let mut count = 0u32;
        let mut cursor = state.tip_hash();

        while let Some(hash) = cursor {
            let block = match state.block_by_hash(&hash) {
                Some(block) => block,
                None => break,
            };
            if !is_hive_mined(&block) {
                break;
            }
            count += 1;
            cursor = Some(block.header.previous_block_hash);
        }

        count
    }

    fn tip_is_hive_mined(&self) -> bool {
        let state = self.state.read().expect("chain state lock not poisoned");
        state
            .tip_hash()
            .and_then(|hash| state.block_by_hash(&hash))
            .map(|block| is_hive_mined(&block))
            .unwrap_or(false)
    }
}
