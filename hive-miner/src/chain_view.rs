//! The narrow view of chain state the block assembler and bee search
//! coordinator need.
//!
//! This is deliberately its own trait rather than a reuse of
//! `hive_network::scheduler::ChainView` (which only answers header-chain
//! membership questions for the download scheduler) or `hive_state::ChainTip`
//! (a `tower::Service`-shaped interface built around the dispatcher's
//! `AlreadyHave`/UTXO needs, whose `tip_watch()` returns a `tokio::sync::watch`
//! receiver this crate has no other reason to depend on `tokio` for). The
//! block assembler's actual needs — difficulty-retarget windows and
//! median-time-past — are different enough from either to warrant their own
//! minimal interface, following the same pattern `hive-network` already
//! established for its own collaborator.

use chrono::{DateTime, Utc};

use hive_chain::block::{self, Height};
use hive_consensus::work::PastBlock;

/// `Sync` because the Bee Search Coordinator's early-abort watcher thread
/// (spec §4.6, §5) polls `tip_hash` from a separate OS thread while worker
/// threads are still searching.
pub trait ChainView: Sync {
    /// The current best-chain tip height.
    fn tip_height(&self) -> Height;

    /// The current best-chain tip hash, linked into the next header's
    /// `previous_block_hash`.
    fn tip_hash(&self) -> block::Hash;

    /// Median of the last eleven blocks' timestamps (`GetMedianTimePast`),
    /// used as the final-tx lock-time cutoff (spec §4.5 step 6).
    fn median_time_past(&self) -> DateTime<Utc>;

    /// The most recent `count` blocks ending at the tip, oldest first. Fed
    /// to [`hive_consensus::work::next_work_required`].
    fn recent_past_blocks(&self, count: usize) -> Vec<PastBlock>;

    /// The most recent `count` Hive-mined blocks, oldest first. Fed to
    /// [`hive_consensus::work::next_hive_work_required`].
    fn recent_hive_past_blocks(&self, count: usize) -> Vec<PastBlock>;

    /// How many Hive blocks have been produced in a row at the tip,
    /// consulted by the Bee Search Coordinator's "must not exceed the
    /// maximum consecutive Hive blocks" precondition (spec §4.6).
    fn consecutive_hive_blocks_at_tip(&self) -> u32;

    /// `true` if the chain tip was itself produced by a Hive proof rather
    /// than proof-of-work, consulted by the "must follow a PoW block"
    /// precondition on networks without the consecutive-Hive-blocks rule.
    fn tip_is_hive_mined(&self) -> bool;
}
