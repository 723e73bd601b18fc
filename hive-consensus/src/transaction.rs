//! Transaction validation.

pub mod check;

use hive_chain::{block::Height, parameters::Network, transaction::Transaction};

use crate::error::TransactionError;

/// The maximum standard transaction weight, mirrored from `policy.h`'s
/// `MAX_STANDARD_TX_WEIGHT`. Used by the Orphan Pool (spec §4.3) to reject
/// oversize orphans before they are ever considered for reprocessing.
pub const MAX_STANDARD_TX_WEIGHT: u64 = 400_000;

/// Returns `Ok(())` if `tx` is final relative to `height` and `block_time`,
/// i.e. its `nLockTime` has already passed (or it opted out via sequence
/// numbers), mirroring Bitcoin's `IsFinalTx`.
pub fn is_final(
    tx: &Transaction,
    height: Height,
    block_time: chrono::DateTime<chrono::Utc>,
) -> Result<(), TransactionError> {
    use hive_chain::transaction::LockTime;

    let locked = match tx.locktime {
        LockTime::Height(lock_height) => lock_height > height,
        LockTime::Time(lock_time) => lock_time.0 > block_time,
    };

    if locked && tx.inputs.iter().any(|input| match input {
        hive_chain::transparent::Input::PrevOut { sequence, .. } => *sequence != u32::MAX,
        hive_chain::transparent::Input::Coinbase { .. } => false,
    }) {
        return Err(TransactionError::LockedUntilAfterBlockTime(block_time));
    }

    Ok(())
}

/// Returns `Ok(())` if this transaction's serialized weight does not exceed
/// [`MAX_STANDARD_TX_WEIGHT`].
pub fn weight_is_standard(tx: &Transaction) -> Result<(), TransactionError> {
    // No segregated witness support (yet) in `hive-chain`, so weight is
    // simply 4x the legacy serialized size, matching BIP 141's formula for
    // an all-legacy transaction.
    let weight = tx.len() as u64 * 4;
    if weight >= MAX_STANDARD_TX_WEIGHT {
        Err(TransactionError::ExceedsStandardWeight)
    } else {
        Ok(())
    }
}

/// Network-level wrapper retained for call sites that want to match this
/// function's historical `(tx, network, height)` signature; `network` is
/// presently unused because lock-time finality has no per-network variance.
pub fn is_final_for_network(
    tx: &Transaction,
    _network: Network,
    height: Height,
    block_time: chrono::DateTime<chrono::Utc>,
) -> Result<(), TransactionError> {
    is_final(tx, height, block_time)
}
