//! The `tower::Service` request/response protocol for the chain-state
//! collaborator, matching the teacher's `zebra-state` `Request`/`Response`
//! shape so downstream crates can be exercised through the same calling
//! convention.

use std::sync::Arc;

use hive_chain::{block, transparent, work::difficulty::ExpandedDifficulty};

use crate::Utxo;

/// Either a block hash or a block height, used to look blocks up by
/// whichever the caller has on hand.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum HashOrHeight {
    Hash(block::Hash),
    Height(block::Height),
}

impl From<block::Hash> for HashOrHeight {
    fn from(hash: block::Hash) -> Self {
        HashOrHeight::Hash(hash)
    }
}

impl From<block::Height> for HashOrHeight {
    fn from(height: block::Height) -> Self {
        HashOrHeight::Height(height)
    }
}

/// A read or write request to the chain-state collaborator.
#[derive(Clone, Debug)]
pub enum Request {
    /// Commits `block` to the best chain.
    CommitBlock(Arc<block::Block>),
    /// Looks up a single unspent output.
    Utxo(transparent::OutPoint),
    /// Returns the tip height and hash, if any.
    Tip,
    /// Returns the cumulative work of the best chain.
    BestChainWork,
    /// `AlreadyHave(inv)`, spec §4.1 `inv` handler.
    Contains(HashOrHeight),
}

/// The chain-state collaborator's reply to a [`Request`].
#[derive(Clone, Debug)]
pub enum Response {
    Committed(block::Hash),
    Utxo(Option<Utxo>),
    Tip(Option<(block::Height, block::Hash)>),
    BestChainWork(ExpandedDifficulty),
    Contains(bool),
}
