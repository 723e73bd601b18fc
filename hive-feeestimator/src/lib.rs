//! Smart transaction fee estimation (spec §4.4): three horizons of
//! exponentially-decayed, fee-rate-bucketed confirmation statistics, and
//! the `estimateSmartFee` composition over them.
//!
//! Ported in spirit from `policy/fees.cpp`'s `TxConfirmStats` /
//! `CBlockPolicyEstimator`. The bucket-boundary and horizon constants
//! (`MIN_BUCKET_FEERATE`, the three `(decay, scale, periods)` triples, the
//! success-percentage thresholds) are standard values carried unchanged
//! from upstream Bitcoin Core's `policy/fees.h`, which was not present in
//! the retained source slice this crate is otherwise grounded on.

mod error;
mod estimator;
mod persistence;
mod stats;

pub use error::FeeEstimatorError;
pub use estimator::{FeeCalculation, FeeEstimateHorizon, FeeEstimator, FeeReason};
pub use stats::FeeBucketStats;

/// A fee rate in satoshis per kilobyte, mirroring `CFeeRate`'s internal
/// representation.
pub type SatPerKb = i64;

pub(crate) const INF_FEERATE: f64 = 1e99;

pub(crate) const MIN_BUCKET_FEERATE: f64 = 1000.0;
pub(crate) const MAX_BUCKET_FEERATE: f64 = 1e7;
pub(crate) const FEE_SPACING: f64 = 1.05;

pub(crate) const SHORT_BLOCK_PERIODS: usize = 12;
pub(crate) const SHORT_SCALE: u32 = 1;
pub(crate) const SHORT_DECAY: f64 = 0.962;

pub(crate) const MED_BLOCK_PERIODS: usize = 24;
pub(crate) const MED_SCALE: u32 = 2;
pub(crate) const MED_DECAY: f64 = 0.9952;

pub(crate) const LONG_BLOCK_PERIODS: usize = 42;
pub(crate) const LONG_SCALE: u32 = 24;
pub(crate) const LONG_DECAY: f64 = 0.99931;

pub(crate) const OLDEST_ESTIMATE_HISTORY: u32 = 6 * 24 * 7;

pub(crate) const SUFFICIENT_FEETXS: f64 = 0.1;
pub(crate) const SUFFICIENT_TXS_SHORT: f64 = 0.5;

pub(crate) const HALF_SUCCESS_PCT: f64 = 0.6;
pub(crate) const SUCCESS_PCT: f64 = 0.85;
pub(crate) const DOUBLE_SUCCESS_PCT: f64 = 0.95;

/// Required fee-estimate-file version below which a read is a non-fatal
/// skip, mirroring `CBlockPolicyEstimator::Read`'s `149900` constant.
pub(crate) const FEE_ESTIMATOR_FILE_VERSION: i32 = 149900;

/// Builds the default bucket boundary table: geometrically spaced from
/// [`MIN_BUCKET_FEERATE`] by [`FEE_SPACING`] up to [`MAX_BUCKET_FEERATE`],
/// terminated by an "infinite" sentinel bucket that catches every fee rate
/// above the highest boundary.
pub(crate) fn default_buckets() -> Vec<f64> {
    let mut buckets = Vec::new();
    let mut boundary = MIN_BUCKET_FEERATE;
    while boundary <= MAX_BUCKET_FEERATE {
        buckets.push(boundary);
        boundary *= FEE_SPACING;
    }
    buckets.push(INF_FEERATE);
    buckets
}

/// `bucketMap.lower_bound(val)`: the index of the smallest boundary ≥
/// `val`. `buckets` must be sorted ascending; the trailing `INF_FEERATE`
/// sentinel guarantees a match always exists.
pub(crate) fn bucket_index(buckets: &[f64], val: f64) -> usize {
    buckets
        .iter()
        .position(|&boundary| boundary >= val)
        .unwrap_or(buckets.len() - 1)
}
