//! Next-block difficulty ("nBits") calculation.
//!
//! Three regimes are supported, selected by the caller (the Block Assembler,
//! spec §4.5) according to which `NetworkUpgrade` is active at the height
//! being built:
//!
//! - classic Bitcoin-style retargeting every `POW_AVERAGING_WINDOW` blocks,
//!   used before MinotaurX/Hive activate;
//! - a linearly-weighted moving average (LWMA-1) used once MinotaurX is
//!   active, which retargets every block instead of every window and tracks
//!   a separate-but-interleaved chain of Hive/PoW blocks.
//!
//! `original_source/src/net_processing.cpp` and `miner.cpp` call into this
//! family of functions as `GetNextWorkRequired` / `GetNextHiveWorkRequired`
//! without including their definitions in the distilled source set, so the
//! exact constants below follow the well-known public LWMA-1 algorithm
//! (as used by several Bitcoin-family forks of this kind) rather than a
//! ported implementation.

use hive_chain::{
    block::{Hash, Header, Height},
    parameters::{Network, NetworkUpgrade, POW_AVERAGING_WINDOW},
    work::difficulty::{CompactDifficulty, ExpandedDifficulty},
};
use primitive_types::U256;

/// Number of blocks averaged by the LWMA-1 retarget used once MinotaurX is
/// active.
pub const LWMA_AVERAGING_WINDOW: i64 = 60;

/// A minimal view of a historical header needed for retargeting: its height,
/// hash, timestamp, and encoded difficulty. The Download Scheduler / Chain
/// collaborator supplies these from the active chain.
#[derive(Copy, Clone, Debug)]
pub struct PastBlock {
    pub height: Height,
    pub time: chrono::DateTime<chrono::Utc>,
    pub difficulty_threshold: CompactDifficulty,
}

/// Computes the required difficulty for the block following `tip`, given
/// the `window` most recent blocks ending at `tip` (oldest first).
///
/// Dispatches to the classic averaging-window retarget or to LWMA-1
/// depending on whether MinotaurX is active at `tip.height + 1`.
pub fn next_work_required(
    network: Network,
    tip: PastBlock,
    window: &[PastBlock],
) -> CompactDifficulty {
    let next_height = tip.height.checked_add(1).expect("height does not overflow");
    if NetworkUpgrade::is_minotaurx_active(network, next_height) {
        lwma_next_work_required(network, window)
    } else {
        classic_next_work_required(network, tip, window)
    }
}

/// The Hive alternate-regime work requirement (`GetNextHiveWorkRequired`):
/// identical retarget math to [`next_work_required`], but computed only over
/// the interleaved sub-chain of Hive blocks. The caller is responsible for
/// filtering `window` down to Hive blocks before calling this function; the
/// math itself does not distinguish Hive from PoW blocks.
pub fn next_hive_work_required(network: Network, hive_window: &[PastBlock]) -> CompactDifficulty {
    lwma_next_work_required(network, hive_window)
}

fn classic_next_work_required(
    network: Network,
    tip: PastBlock,
    window: &[PastBlock],
) -> CompactDifficulty {
    if window.len() < POW_AVERAGING_WINDOW {
        return ExpandedDifficulty::target_difficulty_limit(network).to_compact();
    }

    let first = window[window.len() - POW_AVERAGING_WINDOW];
    let actual_timespan = (tip.time - first.time).num_seconds().max(1);
    let target_timespan =
        NetworkUpgrade::target_spacing_for_height(network, tip.height).num_seconds()
            * POW_AVERAGING_WINDOW as i64;

    // clamp adjustment to [1/4, 4] of the target timespan, matching Bitcoin's
    // classic retarget bounds.
    let clamped = actual_timespan
        .max(target_timespan / 4)
        .min(target_timespan * 4);

    let average_target = average_target(window, POW_AVERAGING_WINDOW);
    let mut new_target = average_target.0 / U256::from(target_timespan as u64)
        * U256::from(clamped.max(0) as u64);

    let limit = ExpandedDifficulty::target_difficulty_limit(network).0;
    if new_target > limit {
        new_target = limit;
    }

    ExpandedDifficulty(new_target).to_compact()
}

/// LWMA-1: `next_target = avg_target * harmonic_weighted(solve_times) / target_spacing`,
/// recomputed every block over the trailing `LWMA_AVERAGING_WINDOW`.
fn lwma_next_work_required(network: Network, window: &[PastBlock]) -> CompactDifficulty {
    let n = LWMA_AVERAGING_WINDOW;
    if (window.len() as i64) < n + 1 {
        return ExpandedDifficulty::target_difficulty_limit(network).to_compact();
    }

    let recent = &window[window.len() - (n as usize + 1)..];
    let target_spacing = NetworkUpgrade::target_spacing_for_height(
        network,
        recent.last().expect("non-empty").height,
    )
    .num_seconds();

    let mut weighted_sum_target = U256::zero();
    let mut weighted_solvetime_sum: i64 = 0;
    let k = n * (n + 1) / 2;

    for i in 1..=n as usize {
        let prev = recent[i - 1];
        let cur = recent[i];
        let mut solvetime = (cur.time - prev.time).num_seconds();
        // bound each solvetime to [-6*target, 6*target] like reference LWMA-1 implementations,
        // preventing a single timestamp outlier from swinging the average too far.
        solvetime = solvetime.max(-6 * target_spacing).min(6 * target_spacing);

        let weight = i as i64;
        weighted_solvetime_sum += solvetime * weight;

        let target = cur
            .difficulty_threshold
            .to_expanded()
            .map(|d| d.0)
            .unwrap_or_else(|| ExpandedDifficulty::target_difficulty_limit(network).0);
        weighted_sum_target += target * U256::from(weight as u64);
    }

    let weighted_solvetime_sum = weighted_solvetime_sum.max(target_spacing * k / 10);
    let average_target = weighted_sum_target / U256::from(k as u64);

    let mut next_target =
        average_target / U256::from(target_spacing as u64) * U256::from(weighted_solvetime_sum as u64) / U256::from(k as u64);

    let limit = ExpandedDifficulty::target_difficulty_limit(network).0;
    if next_target > limit || next_target.is_zero() {
        next_target = limit;
    }

    ExpandedDifficulty(next_target).to_compact()
}

fn average_target(window: &[PastBlock], count: usize) -> ExpandedDifficulty {
    let start = window.len() - count;
    let mut sum = U256::zero();
    for block in &window[start..] {
        let target = block
            .difficulty_threshold
            .to_expanded()
            .map(|d| d.0)
            .unwrap_or_default();
        sum += target / U256::from(count as u64);
    }
    ExpandedDifficulty(sum)
}

/// Returns `true` if `hash` satisfies `threshold` (hash <= threshold),
/// i.e. the block (or Hive bee hash) meets its proof-of-work target.
pub fn meets_target(hash: &Hash, threshold: &ExpandedDifficulty) -> bool {
    hash <= threshold
}

/// Extracts the [`PastBlock`] summary this module needs from a full header.
pub fn past_block(height: Height, header: &Header) -> PastBlock {
    PastBlock {
        height,
        time: header.time,
        difficulty_threshold: header.difficulty_threshold,
    }
}
