//! Network-wide consensus parameters.

mod genesis;
mod network_upgrade;

pub use genesis::{genesis_hash, GENESIS_PREVIOUS_BLOCK_HASH};
pub use network_upgrade::{NetworkUpgrade, POW_AVERAGING_WINDOW};

#[cfg(any(test, feature = "proptest-impl"))]
use proptest_derive::Arbitrary;

/// An instance of the network protocol, with its own genesis block,
/// activation heights, and address version bytes.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[cfg_attr(any(test, feature = "proptest-impl"), derive(Arbitrary))]
pub enum Network {
    /// The production network.
    Mainnet,
    /// The test network.
    Testnet,
}

impl Default for Network {
    fn default() -> Self {
        Network::Mainnet
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Network::Mainnet => write!(f, "Mainnet"),
            Network::Testnet => write!(f, "Testnet"),
        }
    }
}
