//! The Bee Search Coordinator (spec §4.6): a deterministic, parallel hash
//! search across mature Bee Creation Transactions, run on plain OS threads
//! (spec §5's explicit concurrency model — this subsystem is not async)
//! with early abort on chain-tip change.
//!
//! Grounded on `original_source/src/miner.cpp`'s `BusyBees`/`CheckBin`/
//! `CheckBinMinotaur`/`AbortWatchThread`.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use hive_chain::{
    block::{self, Height},
    parameters::{Network, NetworkUpgrade},
    serialization::sha256d,
    transaction,
    transparent::Script,
    work::difficulty::ExpandedDifficulty,
};
use hive_consensus::work;

use crate::assembler::HiveProof;
use crate::chain_view::ChainView;

/// A contiguous range of deterministic bee indices owned by one Bee
/// Creation Transaction (spec §3 `BeeRange`).
#[derive(Debug, Clone)]
pub struct BeeRange {
    pub bct_txid: transaction::Hash,
    pub bct_height: Height,
    pub honey_script: Script,
    pub community_contrib: bool,
    pub offset: u32,
    pub count: u32,
}

/// A mature Bee Creation Transaction the wallet reports as available for
/// mining.
#[derive(Debug, Clone)]
pub struct MatureBct {
    pub txid: transaction::Hash,
    pub height: Height,
    pub bee_count: u32,
    pub community_contrib: bool,
    pub honey_script: Script,
}

/// The narrow wallet collaborator the coordinator needs: enumerating
/// mature BCTs and producing the compact signature over the proof
/// message. Full wallet functionality (key storage, unlocking, balance
/// tracking) is out of scope, so this stays as narrow as [`ChainView`].
pub trait HiveWallet: Sync {
    fn is_locked(&self) -> bool;

    /// Every currently-mature BCT this wallet can prove bees for.
    fn mature_bcts(&self) -> Vec<MatureBct>;

    /// Signs `message_hash` with the private key controlling `bct_txid`'s
    /// honey address, producing the proof script's compact signature.
    /// `None` if the wallet doesn't hold that key.
    fn sign_compact(&self, bct_txid: &transaction::Hash, message_hash: [u8; 32]) -> Option<Vec<u8>>;
}

/// A bee-hash function: `(deterministicRandString, bct-txid, index) ->
/// digest`. The classic regime is always available as
/// [`classic_bee_hash`]; the MinotaurX regime hashes the same input
/// through a different (yespower-family) function this crate doesn't
/// implement, since no such hashing crate is part of this workspace's
/// dependency stack. Callers running under MinotaurX activation must
/// supply their own implementation here.
pub type BeeHasher = fn(&str, &transaction::Hash, u32) -> [u8; 32];

/// `hash256(deterministicRandString ‖ txid ‖ index)`, matching
/// `CheckBin`'s `CHashWriter(SER_GETHASH, 0) << rand << txid << i`.
pub fn classic_bee_hash(rand_string: &str, txid: &transaction::Hash, index: u32) -> [u8; 32] {
    let mut writer = sha256d::Writer::default();
    writer
        .write_all(rand_string.as_bytes())
        .expect("hash writer never fails");
    writer.write_all(&txid.0).expect("hash writer never fails");
    writer
        .write_all(&index.to_le_bytes())
        .expect("hash writer never fails");
    writer.finish()
}

/// Tunables mirroring `-hivecheckthreads`/`-hiveearlyout`/`-hivecheckdelay`.
#[derive(Debug, Clone, Copy)]
pub struct SearchOptions {
    pub thread_count: usize,
    pub early_abort_watcher: bool,
    pub poll_interval: Duration,
}

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions {
            thread_count: num_cpus(),
            early_abort_watcher: true,
            poll_interval: Duration::from_millis(1),
        }
    }
}

fn num_cpus() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

struct Solution {
    range: BeeRange,
    bee_index: u32,
}

pub struct BeeSearchCoordinator {
    options: SearchOptions,
}

impl BeeSearchCoordinator {
    pub fn new(options: SearchOptions) -> Self {
        BeeSearchCoordinator { options }
    }

    /// Runs the full precondition/preparation/search/completion flow (spec
    /// §4.6), returning a winning [`HiveProof`] ready to hand to
    /// [`crate::assembler::BlockAssembler::create_new_block`], or `None` if
    /// mining was skipped or no bee met the target this round.
    #[allow(clippy::too_many_arguments)]
    pub fn search(
        &self,
        chain: &impl ChainView,
        wallet: &impl HiveWallet,
        network: Network,
        peer_count: usize,
        in_initial_block_download: bool,
        max_consecutive_hive_blocks: u32,
        hash_fn: BeeHasher,
    ) -> Option<HiveProof> {
        let height = chain.tip_height().checked_add(1)?;

        if !NetworkUpgrade::is_hive_active(network, height) {
            tracing::debug!("BusyBees: skipping, Hive is not active at this height");
            return None;
        }
        if peer_count == 0 {
            tracing::debug!("BusyBees: skipping, not connected to any peers");
            return None;
        }
        if in_initial_block_download {
            tracing::debug!("BusyBees: skipping, in initial block download");
            return None;
        }
        if chain.consecutive_hive_blocks_at_tip() >= max_consecutive_hive_blocks {
            tracing::info!("BusyBees: skipping, max consecutive Hive blocks reached");
            return None;
        }
        if max_consecutive_hive_blocks <= 1 && chain.tip_is_hive_mined() {
            tracing::info!("BusyBees: skipping, a Hive block must follow a PoW block");
            return None;
        }
        if wallet.is_locked() {
            tracing::debug!("BusyBees: skipping, wallet is locked");
            return None;
        }

        let tip_hash = chain.tip_hash();
        let rand_string = deterministic_rand_string(&tip_hash);
        tracing::debug!(%rand_string, "BusyBees: derived deterministic rand string");

        let hive_window = chain.recent_hive_past_blocks(work::LWMA_AVERAGING_WINDOW as usize + 1);
        let bee_hash_target = work::next_hive_work_required(network, &hive_window).to_expanded()?;

        let mature = wallet.mature_bcts();
        let total_bees: u32 = mature.iter().map(|bct| bct.bee_count).sum();
        if total_bees == 0 {
            tracing::debug!("BusyBees: no mature bees found");
            return None;
        }

        let thread_count = self.options.thread_count.max(1);
        let bins = partition_into_bins(&mature, total_bees, thread_count);
        tracing::info!(
            total_bees,
            bins = bins.len(),
            "BusyBees: bees at work"
        );

        let solution_found = AtomicBool::new(false);
        let early_abort = AtomicBool::new(false);
        let solution: Mutex<Option<Solution>> = Mutex::new(None);

        thread::scope(|scope| {
            for bin in bins {
                let rand_string = rand_string.as_str();
                scope.spawn(|| {
                    check_bin(bin, rand_string, bee_hash_target, hash_fn, &solution_found, &early_abort, &solution);
                });
            }

            if self.options.early_abort_watcher {
                scope.spawn(|| {
                    watch_for_tip_change(
                        chain,
                        tip_hash,
                        &solution_found,
                        &early_abort,
                        self.options.poll_interval,
                    );
                });
            }
        });

        if early_abort.load(Ordering::SeqCst) {
            tracing::info!("BusyBees: chain state changed, check aborted");
            return None;
        }

        let solution = solution.into_inner().expect("search threads never panic while holding the lock")?;
        tracing::info!(
            bee_index = solution.bee_index,
            bct_txid = %solution.range.bct_txid,
            "BusyBees: bee meets hash target"
        );

        build_hive_proof(wallet, &rand_string, solution)
    }
}

/// Greedily fills `thread_count` bins to at most `ceil(total/thread_count)`
/// bees each, splitting a BCT's range across a bin boundary when it
/// doesn't fit, mirroring `BusyBees`'s binning loop.
fn partition_into_bins(mature: &[MatureBct], total_bees: u32, thread_count: usize) -> Vec<Vec<BeeRange>> {
    let bees_per_bin = (total_bees as f64 / thread_count as f64).ceil() as u32;

    let mut bins = Vec::new();
    let mut current_bin: Vec<BeeRange> = Vec::new();
    let mut bees_in_bin = 0u32;

    for bct in mature {
        let mut offset = 0u32;
        while offset < bct.bee_count {
            let space_left = bees_per_bin - bees_in_bin;
            let take = space_left.min(bct.bee_count - offset);
            current_bin.push(BeeRange {
                bct_txid: bct.txid,
                bct_height: bct.height,
                honey_script: bct.honey_script.clone(),
                community_contrib: bct.community_contrib,
                offset,
                count: take,
            });
            offset += take;
            bees_in_bin += take;

            if bees_in_bin >= bees_per_bin {
                bins.push(std::mem::take(&mut current_bin));
                bees_in_bin = 0;
            }
        }
    }
    if !current_bin.is_empty() {
        bins.push(current_bin);
    }
    bins
}

/// `CheckBin`/`CheckBinMinotaur`: exhaustively hashes every bee in every
/// range of `bin`, polling the shared atomics every 1000 iterations and
/// recording the first hash under target.
fn check_bin(
    bin: Vec<BeeRange>,
    rand_string: &str,
    target: ExpandedDifficulty,
    hash_fn: BeeHasher,
    solution_found: &AtomicBool,
    early_abort: &AtomicBool,
    solution: &Mutex<Option<Solution>>,
) {
    let mut checked = 0u64;
    for range in bin {
        for index in range.offset..(range.offset + range.count) {
            checked += 1;
            if checked % 1000 == 0
                && (solution_found.load(Ordering::SeqCst) || early_abort.load(Ordering::SeqCst))
            {
                return;
            }

            let digest = hash_fn(rand_string, &range.bct_txid, index);
            let bee_hash = block::Hash(digest);
            if bee_hash < target {
                let mut guard = solution.lock().expect("solution mutex never poisoned");
                if guard.is_none() {
                    solution_found.store(true, Ordering::SeqCst);
                    *guard = Some(Solution {
                        range,
                        bee_index: index,
                    });
                }
                return;
            }
        }
    }
}

/// `AbortWatchThread`: polls the chain tip and signals `early_abort` the
/// moment it changes out from under the in-progress search.
fn watch_for_tip_change(
    chain: &impl ChainView,
    started_at: block::Hash,
    solution_found: &AtomicBool,
    early_abort: &AtomicBool,
    poll_interval: Duration,
) {
    loop {
        if solution_found.load(Ordering::SeqCst) {
            return;
        }
        if chain.tip_hash() != started_at {
            early_abort.store(true, Ordering::SeqCst);
            return;
        }
        thread::sleep(poll_interval);
    }
}

/// `GetDeterministicRandString`: a string derived from the previous block,
/// re-derived identically by every worker thread and by any peer
/// reproducing the same search.
fn deterministic_rand_string(previous_block_hash: &block::Hash) -> String {
    previous_block_hash.to_string()
}

/// Builds the hive-proof script from a winning solution: `OP_RETURN OP_BEE
/// ‖ LE32(beeIndex) ‖ LE32(bctHeight) ‖ communityBit ‖ txid ‖
/// SignCompact(wallet, hash256(deterministicRandString))`.
fn build_hive_proof(wallet: &impl HiveWallet, rand_string: &str, solution: Solution) -> Option<HiveProof> {
    let message_hash = sha256d::hash(rand_string.as_bytes());
    let signature = wallet.sign_compact(&solution.range.bct_txid, message_hash)?;

    let mut data = Vec::new();
    data.push(hive_script::Opcode::OP_RETURN);
    data.push(hive_script::Opcode::OP_BEE);
    data.extend_from_slice(&solution.bee_index.to_le_bytes());
    data.extend_from_slice(&(solution.range.bct_height.0).to_le_bytes());
    data.push(if solution.range.community_contrib {
        OP_TRUE
    } else {
        OP_FALSE
    });
    data.extend_from_slice(&solution.range.bct_txid.0);
    data.extend_from_slice(&signature);

    Some(HiveProof {
        script: Script(data),
    })
}

const OP_TRUE: u8 = 0x51;
const OP_FALSE: u8 = hive_script::Opcode::OP_0;

#[cfg(test)]
mod tests {
    use super::*;

    fn bct(txid_byte: u8, bee_count: u32) -> MatureBct {
        MatureBct {
            txid: transaction::Hash([txid_byte; 32]),
            height: Height(1),
            bee_count,
            community_contrib: false,
            honey_script: Script(vec![]),
        }
    }

    #[test]
    fn classic_bee_hash_is_deterministic() {
        hive_test::init();
        let txid = transaction::Hash([7; 32]);
        let a = classic_bee_hash("rand", &txid, 3);
        let b = classic_bee_hash("rand", &txid, 3);
        assert_eq!(a, b);

        let c = classic_bee_hash("rand", &txid, 4);
        assert_ne!(a, c);
    }

    #[test]
    fn partition_splits_a_bct_across_bin_boundary() {
        let mature = vec![bct(1, 150)];
        let bins = partition_into_bins(&mature, 150, 2);

        assert_eq!(bins.len(), 2);
        let total: u32 = bins.iter().flatten().map(|r| r.count).sum();
        assert_eq!(total, 150);
    }

    #[test]
    fn partition_keeps_small_bcts_whole_when_possible() {
        let mature = vec![bct(1, 10), bct(2, 10)];
        let bins = partition_into_bins(&mature, 20, 2);

        assert_eq!(bins.len(), 2);
        assert_eq!(bins[0].len(), 1);
        assert_eq!(bins[0][0].count, 10);
    }

    #[test]
    fn check_bin_finds_a_solution_under_a_loose_target() {
        hive_test::init();
        let range = BeeRange {
            bct_txid: transaction::Hash([9; 32]),
            bct_height: Height(1),
            honey_script: Script(vec![]),
            community_contrib: false,
            offset: 0,
            count: 32,
        };

        let loose_target = ExpandedDifficulty(primitive_types::U256::MAX);
        let solution_found = AtomicBool::new(false);
        let early_abort = AtomicBool::new(false);
        let solution = Mutex::new(None);

        check_bin(
            vec![range],
            "rand",
            loose_target,
            classic_bee_hash,
            &solution_found,
            &early_abort,
            &solution,
        );

        assert!(solution_found.load(Ordering::SeqCst));
        assert!(solution.into_inner().unwrap().is_some());
    }
}
