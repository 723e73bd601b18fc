//! Consensus-critical data structures and serialization code for the
//! LitecoinCash-style chain: amounts, blocks, transactions, and the
//! transparent (UTXO) output model.
#![allow(clippy::unit_arg)]

#[macro_use]
extern crate serde;

pub mod amount;
pub mod block;
pub mod cached;
pub mod compactint;
pub mod fmt;
pub mod parameters;
pub mod serialization;
pub mod transaction;
pub mod transparent;
pub mod work;

pub use serialization::{BitcoinDeserialize, BitcoinDeserializeInto, BitcoinSerialize, SerializationError};

/// Proptest strategy parameters shared by the `Arbitrary` impls of
/// [`block::Block`] and [`transaction::Transaction`].
///
/// Threading a single `LedgerState` through a generated chain keeps the
/// generated coinbase placement and heights consistent across blocks.
#[cfg(any(test, feature = "proptest-impl"))]
#[derive(Copy, Clone, Debug)]
pub struct LedgerState {
    /// The height of the current chain tip.
    pub tip_height: block::Height,
    /// The network the generated data is valid for.
    pub network: parameters::Network,
    /// Whether the transaction or input being generated should be a coinbase.
    pub is_coinbase: bool,
}

#[cfg(any(test, feature = "proptest-impl"))]
impl Default for LedgerState {
    fn default() -> Self {
        LedgerState {
            tip_height: block::Height::MIN,
            network: parameters::Network::Mainnet,
            is_coinbase: false,
        }
    }
}
