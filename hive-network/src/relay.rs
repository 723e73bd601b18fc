//! Network-layer relay bookkeeping (spec §4.7): the fast-announce cache for
//! the most recently connected block, and the FIFO-expiring out-of-band
//! message relay. Transaction relay itself is `hive_mempool::relay::RelayMap`,
//! reused here rather than duplicated.

use std::sync::Arc;
use std::time::Duration;

use hive_chain::block::{Block, Hash};

pub use hive_mempool::relay::RelayMap;

/// Default TTL for a fork-specific out-of-band message, distinct from the
/// 15-minute transaction relay TTL.
pub const OUT_OF_BAND_RELAY_EXPIRY: Duration = Duration::from_secs(60 * 10);

/// The most recently connected block, kept ready for the fast-announce path
/// that publishes a `cmpctblock` to peers preferring header-and-ids
/// announcements once per new height.
pub struct MostRecentBlockCache {
    pub block: Option<Arc<Block>>,
    pub hash: Option<Hash>,
    pub witness_present: bool,
}

impl MostRecentBlockCache {
    pub fn new() -> Self {
        MostRecentBlockCache {
            block: None,
            hash: None,
            witness_present: false,
        }
    }

    /// Replaces the cache when a new block is connected, mirroring
    /// `g_last_tip_update`'s single-slot, overwrite-on-connect semantics.
    pub fn set(&mut self, block: Arc<Block>, witness_present: bool) {
        let hash = Hash::from(&block.header);
        self.hash = Some(hash);
        self.block = Some(block);
        self.witness_present = witness_present;
    }
}

impl Default for MostRecentBlockCache {
    fn default() -> Self {
        MostRecentBlockCache::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_replaces_previous_block_on_set() {
        hive_test::init();
        let mut cache = MostRecentBlockCache::new();
        assert!(cache.block.is_none());

        let block = Arc::new(Block {
            header: hive_chain::block::Header::new(
                1,
                Hash([0; 32]),
                hive_chain::block::merkle::Root([0; 32]),
                chrono::Utc::now(),
                hive_chain::work::difficulty::CompactDifficulty(0x1d00ffff),
                0,
            ),
            transactions: Vec::new(),
        });
        cache.set(block.clone(), false);
        assert_eq!(cache.hash, Some(Hash::from(&block.header)));
    }
}
