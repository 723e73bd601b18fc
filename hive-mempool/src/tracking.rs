//! `MempoolTrackingRecord` (spec §3): the per-transaction bookkeeping the
//! fee estimator needs to remove a transaction from every bucket table
//! when it confirms or is evicted, without the fee estimator itself having
//! to understand mempool entry lifetimes.

use hive_chain::block;

/// Records where (which block height a transaction entered the mempool at,
/// and which fee-rate bucket it was filed under) so `hive-feeestimator` can
/// reverse the bookkeeping for a transaction leaving the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MempoolTrackingRecord {
    pub height_entered: block::Height,
    pub bucket_index: usize,
}

impl MempoolTrackingRecord {
    pub fn new(height_entered: block::Height, bucket_index: usize) -> Self {
        MempoolTrackingRecord {
            height_entered,
            bucket_index,
        }
    }

    /// The number of blocks this transaction has spent unconfirmed as of
    /// `current_height`, used to index `unconfTxs[blk mod N][b]`.
    pub fn blocks_in_mempool(&self, current_height: block::Height) -> u32 {
        current_height.0.saturating_sub(self.height_entered.0)
    }
}
