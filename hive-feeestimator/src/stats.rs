//! `FeeBucketStats` (spec §3): one horizon's worth of bucketed,
//! exponentially-decayed confirmation statistics. Ported from
//! `policy/fees.cpp`'s `TxConfirmStats`.

use tracing::trace;

use crate::{bucket_index, FeeEstimatorError};

/// The result of a passing or failing `EstimateMedianVal` bucket range,
/// kept only for diagnostics (mirrors `EstimatorBucket`).
#[derive(Debug, Clone, Copy, Default)]
pub struct EstimatorBucket {
    pub start: f64,
    pub end: f64,
    pub within_target: f64,
    pub total_confirmed: f64,
    pub in_mempool: f64,
    pub left_mempool: f64,
}

/// A bucketed rolling-statistics table parameterized by `(decay, scale,
/// max_periods)`. One instance exists per horizon (short/medium/long).
#[derive(Debug, Clone)]
pub struct FeeBucketStats {
    buckets: Vec<f64>,
    decay: f64,
    scale: u32,

    tx_ct_avg: Vec<f64>,
    avg: Vec<f64>,
    conf_avg: Vec<Vec<f64>>,
    fail_avg: Vec<Vec<f64>>,

    unconf_txs: Vec<Vec<i64>>,
    old_unconf_txs: Vec<i64>,
}

impl FeeBucketStats {
    pub fn new(buckets: Vec<f64>, max_periods: usize, decay: f64, scale: u32) -> Self {
        assert!(scale != 0, "scale must be non-zero");
        let num_buckets = buckets.len();
        let max_confirms = scale as usize * max_periods;
        FeeBucketStats {
            buckets,
            decay,
            scale,
            tx_ct_avg: vec![0.0; num_buckets],
            avg: vec![0.0; num_buckets],
            conf_avg: vec![vec![0.0; num_buckets]; max_periods],
            fail_avg: vec![vec![0.0; num_buckets]; max_periods],
            unconf_txs: vec![vec![0; num_buckets]; max_confirms],
            old_unconf_txs: vec![0; num_buckets],
        }
    }

    pub fn max_confirms(&self) -> u32 {
        self.scale * self.conf_avg.len() as u32
    }

    pub fn decay(&self) -> f64 {
        self.decay
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Rolls the ring buffer forward one block, folding the current slot
    /// into the overflow bucket (mirrors `ClearCurrent`).
    pub fn clear_current(&mut self, block_height: u32) {
        let ring_len = self.unconf_txs.len();
        let slot = block_height as usize % ring_len;
        for bucket in 0..self.buckets.len() {
            self.old_unconf_txs[bucket] += self.unconf_txs[slot][bucket];
            self.unconf_txs[slot][bucket] = 0;
        }
    }

    /// Records that a transaction confirmed after `blocks_to_confirm`
    /// blocks at fee rate `val` (mirrors `Record`).
    pub fn record(&mut self, blocks_to_confirm: i64, val: f64) {
        if blocks_to_confirm < 1 {
            return;
        }
        let periods_to_confirm = ((blocks_to_confirm as u32 + self.scale - 1) / self.scale) as usize;
        let bucket = bucket_index(&self.buckets, val);
        for period in periods_to_confirm..=self.conf_avg.len() {
            self.conf_avg[period - 1][bucket] += 1.0;
        }
        self.tx_ct_avg[bucket] += 1.0;
        self.avg[bucket] += val;
    }

    /// Applies this horizon's decay to every accumulator (mirrors
    /// `UpdateMovingAverages`).
    pub fn update_moving_averages(&mut self) {
        for bucket in 0..self.buckets.len() {
            for period in &mut self.conf_avg {
                period[bucket] *= self.decay;
            }
            for period in &mut self.fail_avg {
                period[bucket] *= self.decay;
            }
            self.avg[bucket] *= self.decay;
            self.tx_ct_avg[bucket] *= self.decay;
        }
    }

    /// Records a brand-new mempool entry at `val`, returning the bucket it
    /// was filed under (mirrors `NewTx`).
    pub fn new_tx(&mut self, block_height: u32, val: f64) -> usize {
        let bucket = bucket_index(&self.buckets, val);
        let slot = block_height as usize % self.unconf_txs.len();
        self.unconf_txs[slot][bucket] += 1;
        bucket
    }

    /// Reverses the bookkeeping `new_tx` performed, and if the transaction
    /// left the mempool without confirming, credits the failure buckets
    /// (mirrors `removeTx`).
    pub fn remove_tx(
        &mut self,
        entry_height: u32,
        best_seen_height: u32,
        bucket_index: usize,
        in_block: bool,
    ) {
        let blocks_ago = if best_seen_height == 0 {
            0i64
        } else {
            best_seen_height as i64 - entry_height as i64
        };
        if blocks_ago < 0 {
            trace!("fee estimator: blocks_ago negative for mempool tx");
            return;
        }

        if blocks_ago as usize >= self.unconf_txs.len() {
            if self.old_unconf_txs[bucket_index] > 0 {
                self.old_unconf_txs[bucket_index] -= 1;
            }
        } else {
            let slot = entry_height as usize % self.unconf_txs.len();
            if self.unconf_txs[slot][bucket_index] > 0 {
                self.unconf_txs[slot][bucket_index] -= 1;
            }
        }

        if !in_block && blocks_ago as u32 >= self.scale {
            let periods_ago = blocks_ago as usize / self.scale as usize;
            for period in 0..periods_ago.min(self.fail_avg.len()) {
                self.fail_avg[period][bucket_index] += 1.0;
            }
        }
    }

    /// `EstimateMedianVal`: the median fee rate of the best-passing bucket
    /// range for `conf_target`, or `-1.0` if none passed.
    #[allow(clippy::too_many_arguments)]
    pub fn estimate_median_val(
        &self,
        conf_target: u32,
        sufficient_tx_val: f64,
        success_break_point: f64,
        require_greater: bool,
        best_seen_height: u32,
    ) -> (f64, EstimatorBucket, EstimatorBucket) {
        let mut n_conf = 0.0;
        let mut total_num = 0.0;
        let mut extra_num = 0.0;
        let mut fail_num = 0.0;

        let period_target = ((conf_target + self.scale - 1) / self.scale) as usize;
        let max_bucket_index = self.buckets.len() - 1;

        let start_bucket = if require_greater { max_bucket_index } else { 0 };
        let step: i64 = if require_greater { -1 } else { 1 };

        let mut cur_near_bucket = start_bucket;
        let mut best_near_bucket = start_bucket;
        let mut cur_far_bucket = start_bucket;
        let mut best_far_bucket = start_bucket;

        let mut found_answer = false;
        let bins = self.unconf_txs.len();
        let mut new_bucket_range = true;
        let mut passing = true;
        let mut pass_bucket = EstimatorBucket::default();
        let mut fail_bucket = EstimatorBucket::default();

        let mut bucket = start_bucket as i64;
        while bucket >= 0 && bucket <= max_bucket_index as i64 {
            let b = bucket as usize;
            if new_bucket_range {
                cur_near_bucket = b;
                new_bucket_range = false;
            }
            cur_far_bucket = b;

            n_conf += self.conf_avg[period_target - 1][b];
            total_num += self.tx_ct_avg[b];
            fail_num += self.fail_avg[period_target - 1][b];
            for conf_ct in conf_target as usize..self.max_confirms() as usize {
                let slot = (best_seen_height as i64 - conf_ct as i64).rem_euclid(bins as i64) as usize;
                extra_num += self.unconf_txs[slot][b] as f64;
            }
            extra_num += self.old_unconf_txs[b] as f64;

            if total_num >= sufficient_tx_val / (1.0 - self.decay) {
                let cur_pct = n_conf / (total_num + fail_num + extra_num);

                let fails = (require_greater && cur_pct < success_break_point)
                    || (!require_greater && cur_pct > success_break_point);

                if fails {
                    if passing {
                        let fail_min = cur_near_bucket.min(cur_far_bucket);
                        let fail_max = cur_near_bucket.max(cur_far_bucket);
                        fail_bucket.start = if fail_min > 0 { self.buckets[fail_min - 1] } else { 0.0 };
                        fail_bucket.end = self.buckets[fail_max];
                        fail_bucket.within_target = n_conf;
                        fail_bucket.total_confirmed = total_num;
                        fail_bucket.in_mempool = extra_num;
                        fail_bucket.left_mempool = fail_num;
                        passing = false;
                    }
                } else {
                    fail_bucket = EstimatorBucket::default();
                    found_answer = true;
                    passing = true;
                    pass_bucket.within_target = n_conf;
                    n_conf = 0.0;
                    pass_bucket.total_confirmed = total_num;
                    total_num = 0.0;
                    pass_bucket.in_mempool = extra_num;
                    pass_bucket.left_mempool = fail_num;
                    fail_num = 0.0;
                    extra_num = 0.0;
                    best_near_bucket = cur_near_bucket;
                    best_far_bucket = cur_far_bucket;
                    new_bucket_range = true;
                }
            }

            bucket += step;
        }

        let mut median = -1.0;
        let min_bucket = best_near_bucket.min(best_far_bucket);
        let max_bucket = best_near_bucket.max(best_far_bucket);
        let mut tx_sum: f64 = (min_bucket..=max_bucket).map(|j| self.tx_ct_avg[j]).sum();

        if found_answer && tx_sum != 0.0 {
            tx_sum /= 2.0;
            for j in min_bucket..=max_bucket {
                if self.tx_ct_avg[j] < tx_sum {
                    tx_sum -= self.tx_ct_avg[j];
                } else {
                    median = self.avg[j] / self.tx_ct_avg[j];
                    break;
                }
            }
            pass_bucket.start = if min_bucket > 0 { self.buckets[min_bucket - 1] } else { 0.0 };
            pass_bucket.end = self.buckets[max_bucket];
        }

        if passing && !new_bucket_range {
            let fail_min = cur_near_bucket.min(cur_far_bucket);
            let fail_max = cur_near_bucket.max(cur_far_bucket);
            fail_bucket.start = if fail_min > 0 { self.buckets[fail_min - 1] } else { 0.0 };
            fail_bucket.end = self.buckets[fail_max];
            fail_bucket.within_target = n_conf;
            fail_bucket.total_confirmed = total_num;
            fail_bucket.in_mempool = extra_num;
            fail_bucket.left_mempool = fail_num;
        }

        (median, pass_bucket, fail_bucket)
    }

    pub(crate) fn read(
        buckets: Vec<f64>,
        decay: f64,
        scale: u32,
        avg: Vec<f64>,
        tx_ct_avg: Vec<f64>,
        conf_avg: Vec<Vec<f64>>,
        fail_avg: Vec<Vec<f64>>,
    ) -> Result<Self, FeeEstimatorError> {
        if !(decay > 0.0 && decay < 1.0) {
            return Err(FeeEstimatorError::Corrupt(
                "decay must be between 0 and 1 (non-inclusive)",
            ));
        }
        if scale == 0 {
            return Err(FeeEstimatorError::Corrupt("scale must be non-zero"));
        }
        let num_buckets = buckets.len();
        if avg.len() != num_buckets || tx_ct_avg.len() != num_buckets {
            return Err(FeeEstimatorError::Corrupt(
                "mismatch in feerate average bucket count",
            ));
        }
        let max_periods = conf_avg.len();
        let max_confirms = scale as u32 * max_periods as u32;
        if max_confirms == 0 || max_confirms > crate::OLDEST_ESTIMATE_HISTORY {
            return Err(FeeEstimatorError::Corrupt(
                "must maintain estimates for between 1 and 1008 confirms",
            ));
        }
        if conf_avg.iter().any(|p| p.len() != num_buckets) {
            return Err(FeeEstimatorError::Corrupt(
                "mismatch in feerate conf average bucket count",
            ));
        }
        if fail_avg.len() != max_periods || fail_avg.iter().any(|p| p.len() != num_buckets) {
            return Err(FeeEstimatorError::Corrupt(
                "mismatch in confirms tracked for failures",
            ));
        }

        let unconf_txs = vec![vec![0i64; num_buckets]; max_confirms as usize];
        let old_unconf_txs = vec![0i64; num_buckets];

        Ok(FeeBucketStats {
            buckets,
            decay,
            scale,
            tx_ct_avg,
            avg,
            conf_avg,
            fail_avg,
            unconf_txs,
            old_unconf_txs,
        })
    }

    pub(crate) fn avg(&self) -> &[f64] {
        &self.avg
    }
    pub(crate) fn tx_ct_avg(&self) -> &[f64] {
        &self.tx_ct_avg
    }
    pub(crate) fn conf_avg(&self) -> &[Vec<f64>] {
        &self.conf_avg
    }
    pub(crate) fn fail_avg(&self) -> &[Vec<f64>] {
        &self.fail_avg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::default_buckets;

    #[test]
    fn new_tx_then_record_round_trips_bucket() {
        hive_test::init();
        let buckets = default_buckets();
        let mut stats = FeeBucketStats::new(buckets, 24, 0.9952, 2);
        let bucket = stats.new_tx(100, 5000.0);
        stats.remove_tx(100, 103, bucket, true);
        stats.record(3, 5000.0);
        assert!(stats.tx_ct_avg()[bucket] > 0.0);
    }

    #[test]
    fn decay_shrinks_accumulators() {
        hive_test::init();
        let buckets = default_buckets();
        let mut stats = FeeBucketStats::new(buckets, 24, 0.5, 2);
        stats.record(3, 5000.0);
        let bucket = crate::bucket_index(&default_buckets(), 5000.0);
        let before = stats.tx_ct_avg()[bucket];
        stats.update_moving_averages();
        assert!(stats.tx_ct_avg()[bucket] < before);
    }
}
