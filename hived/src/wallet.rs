//! No wallet/keystore crate exists anywhere in this workspace (key
//! storage and signing are explicitly out of scope — `hive-chain` only
//! models the wire types, never private keys). `NullHiveWallet` is an
//! honest stand-in: it reports no mature bees, so
//! [`hive_miner::BeeSearchCoordinator::search`] always returns early at
//! its "no mature bees found" precondition rather than silently
//! fabricating signatures. A real deployment would substitute a wallet
//! crate implementing [`hive_miner::HiveWallet`] here.

use hive_chain::transaction;
use hive_miner::bee_search::MatureBct;
use hive_miner::HiveWallet;

pub struct NullHiveWallet;

impl HiveWallet for NullHiveWallet {
    fn is_locked(&self) -> bool {
        false
    }

    fn mature_bcts(&self) -> Vec<MatureBct> {
        Vec::new()
    }

    fn sign_compact(&self, _bct_txid: &transaction::Hash, _message_hash: [u8; 32]) -> Option<Vec<u8>> {
        None
    }
}
