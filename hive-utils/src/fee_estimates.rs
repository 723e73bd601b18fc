//! Inspects a fee-estimate file (spec §6 "Fee-estimate file") without
//! running a node, by loading it through the same
//! [`hive_feeestimator::FeeEstimator::read`] codec `hived` uses on startup.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use color_eyre::eyre::{eyre, Result};
use hive_feeestimator::FeeEstimator;

/// Standard confirmation targets to report, matching the targets
/// `estimatesmartfee` is commonly queried with.
const CONF_TARGETS: &[u32] = &[1, 2, 6, 12, 24, 144, 504, 1008];

pub fn dump(path: &Path) -> Result<()> {
    let file = BufReader::new(File::open(path)?);
    let estimator = FeeEstimator::read(file)?
        .ok_or_else(|| eyre!("{} was written by an older, unsupported format version", path.display()))?;

    println!("best seen height: {}", estimator.best_seen_height());
    println!();
    println!("{:>6}  {:>14}  {:>14}", "target", "conservative", "economical");

    for &target in CONF_TARGETS {
        let (conservative_rate, conservative_calc) = estimator.estimate_smart_fee(target, true);
        let (economical_rate, economical_calc) = estimator.estimate_smart_fee(target, false);
        println!(
            "{:>6}  {:>14}  {:>14}",
            target,
            format_rate(conservative_rate),
            format_rate(economical_rate),
        );
        tracing::debug!(target, ?conservative_calc, ?economical_calc, "estimate detail");
    }

    Ok(())
}

fn format_rate(sat_per_kb: hive_feeestimator::SatPerKb) -> String {
    if sat_per_kb < 0 {
        "n/a".to_string()
    } else {
        format!("{} sat/kvB", sat_per_kb)
    }
}
