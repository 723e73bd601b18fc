//! `FeeEstimator` (spec §4.4): the three-horizon collaborator that tracks
//! mempool entries through confirmation or eviction and composes
//! `estimateSmartFee`. Ported from `policy/fees.cpp`'s
//! `CBlockPolicyEstimator`.

use std::collections::HashMap;

use tracing::{debug, trace};

use hive_chain::transaction;

use crate::{
    default_buckets, stats::EstimatorBucket, FeeBucketStats, SatPerKb, DOUBLE_SUCCESS_PCT,
    HALF_SUCCESS_PCT, LONG_BLOCK_PERIODS, LONG_DECAY, LONG_SCALE, MED_BLOCK_PERIODS, MED_DECAY,
    MED_SCALE, OLDEST_ESTIMATE_HISTORY, SHORT_BLOCK_PERIODS, SHORT_DECAY, SHORT_SCALE,
    SUCCESS_PCT, SUFFICIENT_FEETXS, SUFFICIENT_TXS_SHORT,
};

/// Which horizon a raw-fee query should draw from (mirrors
/// `FeeEstimateHorizon`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeEstimateHorizon {
    Short,
    Medium,
    Long,
}

/// Why `estimate_smart_fee` returned the value it did, mirroring
/// `FeeReason`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeReason {
    None,
    HalfEstimate,
    FullEstimate,
    DoubleEstimate,
    Conservative,
}

/// Diagnostic detail accompanying a smart-fee estimate.
#[derive(Debug, Clone, Copy)]
pub struct FeeCalculation {
    pub desired_target: u32,
    pub returned_target: u32,
    pub reason: FeeReason,
    pub pass: EstimatorBucket,
    pub fail: EstimatorBucket,
}

struct TxStatsInfo {
    block_height: u32,
    bucket_index: usize,
}

/// The three-horizon fee estimator.
pub struct FeeEstimator {
    buckets: Vec<f64>,
    short_stats: FeeBucketStats,
    med_stats: FeeBucketStats,
    long_stats: FeeBucketStats,

    best_seen_height: u32,
    first_recorded_height: u32,
    historical_first: u32,
    historical_best: u32,

    tracked_txs: u32,
    untracked_txs: u32,

    mempool_txs: HashMap<transaction::Hash, TxStatsInfo>,
}

impl Default for FeeEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl FeeEstimator {
    pub fn new() -> Self {
        let buckets = default_buckets();
        FeeEstimator {
            short_stats: FeeBucketStats::new(buckets.clone(), SHORT_BLOCK_PERIODS, SHORT_DECAY, SHORT_SCALE),
            med_stats: FeeBucketStats::new(buckets.clone(), MED_BLOCK_PERIODS, MED_DECAY, MED_SCALE),
            long_stats: FeeBucketStats::new(buckets.clone(), LONG_BLOCK_PERIODS, LONG_DECAY, LONG_SCALE),
            buckets,
            best_seen_height: 0,
            first_recorded_height: 0,
            historical_first: 0,
            historical_best: 0,
            tracked_txs: 0,
            untracked_txs: 0,
            mempool_txs: HashMap::new(),
        }
    }

    pub(crate) fn from_parts(
        buckets: Vec<f64>,
        short_stats: FeeBucketStats,
        med_stats: FeeBucketStats,
        long_stats: FeeBucketStats,
        best_seen_height: u32,
        historical_first: u32,
        historical_best: u32,
    ) -> Self {
        FeeEstimator {
            buckets,
            short_stats,
            med_stats,
            long_stats,
            best_seen_height,
            first_recorded_height: 0,
            historical_first,
            historical_best,
            tracked_txs: 0,
            untracked_txs: 0,
            mempool_txs: HashMap::new(),
        }
    }

    pub(crate) fn buckets(&self) -> &[f64] {
        &self.buckets
    }
    pub(crate) fn short_stats(&self) -> &FeeBucketStats {
        &self.short_stats
    }
    pub(crate) fn med_stats(&self) -> &FeeBucketStats {
        &self.med_stats
    }
    pub(crate) fn long_stats(&self) -> &FeeBucketStats {
        &self.long_stats
    }
    pub fn best_seen_height(&self) -> u32 {
        self.best_seen_height
    }
    pub(crate) fn historical_first(&self) -> u32 {
        self.historical_first
    }
    pub(crate) fn historical_best(&self) -> u32 {
        self.historical_best
    }

    fn stats(&self, horizon: FeeEstimateHorizon) -> (&FeeBucketStats, f64) {
        match horizon {
            FeeEstimateHorizon::Short => (&self.short_stats, SUFFICIENT_TXS_SHORT),
            FeeEstimateHorizon::Medium => (&self.med_stats, SUFFICIENT_FEETXS),
            FeeEstimateHorizon::Long => (&self.long_stats, SUFFICIENT_FEETXS),
        }
    }

    /// `processTransaction`: files a freshly-accepted mempool entry into
    /// every horizon's bucket tables, recording enough to reverse the
    /// bookkeeping later in `remove_tx`.
    pub fn process_transaction(
        &mut self,
        hash: transaction::Hash,
        tx_height: u32,
        fee_rate: f64,
        valid_fee_estimate: bool,
    ) {
        if self.mempool_txs.contains_key(&hash) {
            trace!(?hash, "fee estimator: tx already tracked");
            return;
        }
        if tx_height != self.best_seen_height {
            return;
        }
        if !valid_fee_estimate {
            self.untracked_txs += 1;
            return;
        }
        self.tracked_txs += 1;

        let bucket = self.med_stats.new_tx(tx_height, fee_rate);
        let short_bucket = self.short_stats.new_tx(tx_height, fee_rate);
        let long_bucket = self.long_stats.new_tx(tx_height, fee_rate);
        debug_assert_eq!(bucket, short_bucket);
        debug_assert_eq!(bucket, long_bucket);

        self.mempool_txs.insert(
            hash,
            TxStatsInfo {
                block_height: tx_height,
                bucket_index: bucket,
            },
        );
    }

    /// `removeTx`: reverses `process_transaction`'s bookkeeping for a
    /// transaction leaving the mempool (confirmed or evicted).
    pub fn remove_tx(&mut self, hash: &transaction::Hash, in_block: bool) -> bool {
        match self.mempool_txs.remove(hash) {
            Some(info) => {
                self.med_stats
                    .remove_tx(info.block_height, self.best_seen_height, info.bucket_index, in_block);
                self.short_stats
                    .remove_tx(info.block_height, self.best_seen_height, info.bucket_index, in_block);
                self.long_stats
                    .remove_tx(info.block_height, self.best_seen_height, info.bucket_index, in_block);
                true
            }
            None => false,
        }
    }

    fn process_block_tx(&mut self, block_height: u32, hash: &transaction::Hash, fee_rate: f64) -> bool {
        let entry = match self.mempool_txs.get(hash) {
            Some(entry) => (entry.block_height, entry.bucket_index),
            None => return false,
        };
        if !self.remove_tx(hash, true) {
            return false;
        }

        let blocks_to_confirm = block_height as i64 - entry.0 as i64;
        if blocks_to_confirm <= 0 {
            trace!("fee estimator: negative blocksToConfirm");
            return false;
        }

        self.med_stats.record(blocks_to_confirm, fee_rate);
        self.short_stats.record(blocks_to_confirm, fee_rate);
        self.long_stats.record(blocks_to_confirm, fee_rate);
        true
    }

    /// `processBlock`: rolls every horizon's ring buffer forward and
    /// records each confirmed entry's wait time.
    pub fn process_block(&mut self, block_height: u32, confirmed: &[(transaction::Hash, f64)]) {
        if block_height <= self.best_seen_height {
            return;
        }
        self.best_seen_height = block_height;

        self.med_stats.clear_current(block_height);
        self.short_stats.clear_current(block_height);
        self.long_stats.clear_current(block_height);

        self.med_stats.update_moving_averages();
        self.short_stats.update_moving_averages();
        self.long_stats.update_moving_averages();

        let mut counted = 0u32;
        for (hash, fee_rate) in confirmed {
            if self.process_block_tx(block_height, hash, *fee_rate) {
                counted += 1;
            }
        }

        if self.first_recorded_height == 0 && counted > 0 {
            self.first_recorded_height = self.best_seen_height;
        }

        debug!(
            counted,
            total = confirmed.len(),
            tracked = self.tracked_txs,
            "fee estimator: processed block"
        );

        self.tracked_txs = 0;
        self.untracked_txs = 0;
    }

    /// Evicts every still-tracked mempool transaction as unconfirmed,
    /// mirroring `FlushUnconfirmed`, called when the mempool is cleared or
    /// on shutdown.
    pub fn flush_unconfirmed(&mut self, hashes: &[transaction::Hash]) {
        for hash in hashes {
            self.remove_tx(hash, false);
        }
    }

    pub(crate) fn first_recorded_height(&self) -> u32 {
        self.first_recorded_height
    }

    pub(crate) fn block_span(&self) -> u32 {
        if self.first_recorded_height == 0 {
            return 0;
        }
        self.best_seen_height - self.first_recorded_height
    }

    pub(crate) fn historical_block_span(&self) -> u32 {
        if self.historical_first == 0 {
            return 0;
        }
        if self.best_seen_height.saturating_sub(self.historical_best) > OLDEST_ESTIMATE_HISTORY {
            return 0;
        }
        self.historical_best - self.historical_first
    }

    fn max_usable_estimate(&self) -> u32 {
        self.long_stats
            .max_confirms()
            .min(self.block_span().max(self.historical_block_span()) / 2)
    }

    /// `estimateRawFee`: a single-horizon estimate at `success_threshold`.
    pub fn estimate_raw_fee(
        &self,
        conf_target: u32,
        success_threshold: f64,
        horizon: FeeEstimateHorizon,
    ) -> SatPerKb {
        let (stats, sufficient_txs) = self.stats(horizon);
        if conf_target == 0 || conf_target > stats.max_confirms() || success_threshold > 1.0 {
            return 0;
        }
        let (median, _, _) =
            stats.estimate_median_val(conf_target, sufficient_txs, success_threshold, true, self.best_seen_height);
        if median < 0.0 {
            0
        } else {
            median.round() as SatPerKb
        }
    }

    fn estimate_combined_fee(
        &self,
        conf_target: u32,
        success_threshold: f64,
        check_shorter_horizon: bool,
    ) -> (f64, EstimatorBucket, EstimatorBucket) {
        let mut estimate = -1.0;
        let mut pass = EstimatorBucket::default();
        let mut fail = EstimatorBucket::default();

        if conf_target >= 1 && conf_target <= self.long_stats.max_confirms() {
            let (med, p, f) = if conf_target <= self.short_stats.max_confirms() {
                self.short_stats.estimate_median_val(
                    conf_target,
                    SUFFICIENT_TXS_SHORT,
                    success_threshold,
                    true,
                    self.best_seen_height,
                )
            } else if conf_target <= self.med_stats.max_confirms() {
                self.med_stats.estimate_median_val(
                    conf_target,
                    SUFFICIENT_FEETXS,
                    success_threshold,
                    true,
                    self.best_seen_height,
                )
            } else {
                self.long_stats.estimate_median_val(
                    conf_target,
                    SUFFICIENT_FEETXS,
                    success_threshold,
                    true,
                    self.best_seen_height,
                )
            };
            estimate = med;
            pass = p;
            fail = f;

            if check_shorter_horizon {
                if conf_target > self.med_stats.max_confirms() {
                    let (med_max, p2, f2) = self.med_stats.estimate_median_val(
                        self.med_stats.max_confirms(),
                        SUFFICIENT_FEETXS,
                        success_threshold,
                        true,
                        self.best_seen_height,
                    );
                    if med_max > 0.0 && (estimate == -1.0 || med_max < estimate) {
                        estimate = med_max;
                        pass = p2;
                        fail = f2;
                    }
                }
                if conf_target > self.short_stats.max_confirms() {
                    let (short_max, p3, f3) = self.short_stats.estimate_median_val(
                        self.short_stats.max_confirms(),
                        SUFFICIENT_TXS_SHORT,
                        success_threshold,
                        true,
                        self.best_seen_height,
                    );
                    if short_max > 0.0 && (estimate == -1.0 || short_max < estimate) {
                        estimate = short_max;
                        pass = p3;
                        fail = f3;
                    }
                }
            }
        }

        (estimate, pass, fail)
    }

    fn estimate_conservative_fee(&self, double_target: u32) -> (f64, EstimatorBucket, EstimatorBucket) {
        let mut estimate = -1.0;
        let mut pass = EstimatorBucket::default();
        let mut fail = EstimatorBucket::default();

        if double_target <= self.short_stats.max_confirms() {
            let (med, p, f) = self.med_stats.estimate_median_val(
                double_target,
                SUFFICIENT_FEETXS,
                DOUBLE_SUCCESS_PCT,
                true,
                self.best_seen_height,
            );
            estimate = med;
            pass = p;
            fail = f;
        }
        if double_target <= self.med_stats.max_confirms() {
            let (long_est, p, f) = self.long_stats.estimate_median_val(
                double_target,
                SUFFICIENT_FEETXS,
                DOUBLE_SUCCESS_PCT,
                true,
                self.best_seen_height,
            );
            if long_est > estimate {
                estimate = long_est;
                pass = p;
                fail = f;
            }
        }

        (estimate, pass, fail)
    }

    /// `estimateSmartFee`: the user-facing composition over all three
    /// horizons (spec §4.4 "Smart-fee composition").
    pub fn estimate_smart_fee(&self, mut conf_target: u32, conservative: bool) -> (SatPerKb, FeeCalculation) {
        let mut calc = FeeCalculation {
            desired_target: conf_target,
            returned_target: conf_target,
            reason: FeeReason::None,
            pass: EstimatorBucket::default(),
            fail: EstimatorBucket::default(),
        };

        if conf_target == 0 || conf_target > self.long_stats.max_confirms() {
            return (0, calc);
        }
        if conf_target == 1 {
            conf_target = 2;
        }

        let max_usable = self.max_usable_estimate();
        if conf_target > max_usable {
            conf_target = max_usable;
        }
        calc.returned_target = conf_target;

        if conf_target <= 1 {
            return (0, calc);
        }

        let (half_est, half_pass, half_fail) =
            self.estimate_combined_fee(conf_target / 2, HALF_SUCCESS_PCT, true);
        calc.pass = half_pass;
        calc.fail = half_fail;
        calc.reason = FeeReason::HalfEstimate;
        let mut median = half_est;

        let (actual_est, actual_pass, actual_fail) =
            self.estimate_combined_fee(conf_target, SUCCESS_PCT, true);
        if actual_est > median {
            median = actual_est;
            calc.pass = actual_pass;
            calc.fail = actual_fail;
            calc.reason = FeeReason::FullEstimate;
        }

        let (double_est, double_pass, double_fail) =
            self.estimate_combined_fee(2 * conf_target, DOUBLE_SUCCESS_PCT, !conservative);
        if double_est > median {
            median = double_est;
            calc.pass = double_pass;
            calc.fail = double_fail;
            calc.reason = FeeReason::DoubleEstimate;
        }

        if conservative || median == -1.0 {
            let (cons_est, cons_pass, cons_fail) = self.estimate_conservative_fee(2 * conf_target);
            if cons_est > median {
                median = cons_est;
                calc.pass = cons_pass;
                calc.fail = cons_fail;
                calc.reason = FeeReason::Conservative;
            }
        }

        if median < 0.0 {
            (0, calc)
        } else {
            (median.round() as SatPerKb, calc)
        }
    }
}
