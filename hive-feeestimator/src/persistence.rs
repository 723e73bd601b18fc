//! The fee-estimate file codec (spec §6 "Fee-estimate file"). Ported from
//! `CBlockPolicyEstimator::Write` / `::Read`.

use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use hive_chain::compactint::CompactInt;
use hive_chain::serialization::{BitcoinDeserialize, BitcoinSerialize};

use crate::{stats::FeeBucketStats, FeeEstimator, FeeEstimatorError, FEE_ESTIMATOR_FILE_VERSION};

fn write_f64<W: Write>(mut w: W, val: f64) -> io::Result<()> {
    w.write_f64::<LittleEndian>(val)
}

fn read_f64<R: Read>(mut r: R) -> io::Result<f64> {
    r.read_f64::<LittleEndian>()
}

fn write_vec_f64<W: Write>(mut w: W, vals: &[f64]) -> io::Result<()> {
    CompactInt::from(vals.len()).bitcoin_serialize(&mut w)?;
    for v in vals {
        write_f64(&mut w, *v)?;
    }
    Ok(())
}

fn read_vec_f64<R: Read>(mut r: R) -> Result<Vec<f64>, FeeEstimatorError> {
    let len = CompactInt::bitcoin_deserialize(&mut r)?.value() as usize;
    let mut out = Vec::with_capacity(len);
    for _ in 0..len {
        out.push(read_f64(&mut r)?);
    }
    Ok(out)
}

fn write_vec_vec_f64<W: Write>(mut w: W, vals: &[Vec<f64>]) -> io::Result<()> {
    CompactInt::from(vals.len()).bitcoin_serialize(&mut w)?;
    for v in vals {
        write_vec_f64(&mut w, v)?;
    }
    Ok(())
}

fn read_vec_vec_f64<R: Read>(mut r: R) -> Result<Vec<Vec<f64>>, FeeEstimatorError> {
    let len = CompactInt::bitcoin_deserialize(&mut r)?.value() as usize;
    let mut out = Vec::with_capacity(len);
    for _ in 0..len {
        out.push(read_vec_f64(&mut r)?);
    }
    Ok(out)
}

fn write_stats<W: Write>(mut w: W, stats: &FeeBucketStats) -> io::Result<()> {
    write_f64(&mut w, stats.decay())?;
    stats.scale().bitcoin_serialize(&mut w)?;
    write_vec_f64(&mut w, stats.avg())?;
    write_vec_f64(&mut w, stats.tx_ct_avg())?;
    write_vec_vec_f64(&mut w, stats.conf_avg())?;
    write_vec_vec_f64(&mut w, stats.fail_avg())?;
    Ok(())
}

fn read_stats<R: Read>(mut r: R, buckets: Vec<f64>) -> Result<FeeBucketStats, FeeEstimatorError> {
    let decay = read_f64(&mut r)?;
    let scale = u32::bitcoin_deserialize(&mut r)?;
    let avg = read_vec_f64(&mut r)?;
    let tx_ct_avg = read_vec_f64(&mut r)?;
    let conf_avg = read_vec_vec_f64(&mut r)?;
    let fail_avg = read_vec_vec_f64(&mut r)?;
    FeeBucketStats::read(buckets, decay, scale, avg, tx_ct_avg, conf_avg, fail_avg)
}

impl FeeEstimator {
    /// Writes the fee-estimate file. Mirrors `CBlockPolicyEstimator::Write`:
    /// failures are logged and swallowed upstream, but here we surface
    /// `io::Error` to the caller, who may treat write failure as non-fatal.
    pub fn write<W: Write>(&self, mut w: W) -> io::Result<()> {
        FEE_ESTIMATOR_FILE_VERSION.bitcoin_serialize(&mut w)?;
        FEE_ESTIMATOR_FILE_VERSION.bitcoin_serialize(&mut w)?;

        self.best_seen_height().bitcoin_serialize(&mut w)?;
        if self.block_span() > self.historical_block_span() / 2 {
            self.first_recorded_height().bitcoin_serialize(&mut w)?;
            self.best_seen_height().bitcoin_serialize(&mut w)?;
        } else {
            self.historical_first().bitcoin_serialize(&mut w)?;
            self.historical_best().bitcoin_serialize(&mut w)?;
        }

        write_vec_f64(&mut w, self.buckets())?;
        write_stats(&mut w, self.med_stats())?;
        write_stats(&mut w, self.short_stats())?;
        write_stats(&mut w, self.long_stats())?;
        Ok(())
    }

    /// Reads a fee-estimate file previously written by [`Self::write`].
    /// A `required-version` below [`FEE_ESTIMATOR_FILE_VERSION`] is a
    /// non-fatal skip that returns `Ok(None)`, matching
    /// `CBlockPolicyEstimator::Read`'s handling of pre-upgrade files.
    pub fn read<R: Read>(mut r: R) -> Result<Option<FeeEstimator>, FeeEstimatorError> {
        let required_version = i32::bitcoin_deserialize(&mut r)?;
        let _written_version = i32::bitcoin_deserialize(&mut r)?;
        if required_version > FEE_ESTIMATOR_FILE_VERSION {
            return Err(FeeEstimatorError::UpVersion {
                required: required_version,
                supported: FEE_ESTIMATOR_FILE_VERSION,
            });
        }

        let best_seen_height = u32::bitcoin_deserialize(&mut r)?;

        if required_version < FEE_ESTIMATOR_FILE_VERSION {
            return Ok(None);
        }

        let historical_first = u32::bitcoin_deserialize(&mut r)?;
        let historical_best = u32::bitcoin_deserialize(&mut r)?;
        if historical_first > historical_best || historical_best > best_seen_height {
            return Err(FeeEstimatorError::Corrupt(
                "historical block range for estimates is invalid",
            ));
        }

        let buckets = read_vec_f64(&mut r)?;
        if buckets.len() <= 1 || buckets.len() > 1000 {
            return Err(FeeEstimatorError::Corrupt(
                "must have between 2 and 1000 feerate buckets",
            ));
        }

        let med_stats = read_stats(&mut r, buckets.clone())?;
        let short_stats = read_stats(&mut r, buckets.clone())?;
        let long_stats = read_stats(&mut r, buckets.clone())?;

        Ok(Some(FeeEstimator::from_parts(
            buckets,
            short_stats,
            med_stats,
            long_stats,
            best_seen_height,
            historical_first,
            historical_best,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trips() {
        hive_test::init();
        let mut estimator = FeeEstimator::new();
        estimator.process_block(100, &[]);

        let mut buf = Vec::new();
        estimator.write(&mut buf).unwrap();

        let restored = FeeEstimator::read(&buf[..]).unwrap().unwrap();
        assert_eq!(restored.best_seen_height(), 100);
    }

    #[test]
    fn old_version_is_nonfatal_skip() {
        hive_test::init();
        let mut buf = Vec::new();
        (FEE_ESTIMATOR_FILE_VERSION - 1).bitcoin_serialize(&mut buf).unwrap();
        (FEE_ESTIMATOR_FILE_VERSION - 1).bitcoin_serialize(&mut buf).unwrap();
        42u32.bitcoin_serialize(&mut buf).unwrap();

        let result = FeeEstimator::read(&buf[..]).unwrap();
        assert!(result.is_none());
    }
}
