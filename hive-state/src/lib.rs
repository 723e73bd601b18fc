//! A narrow chain-state collaborator.
//!
//! Per the specification, the on-disk block/UTXO databases are out of
//! scope for this workspace: the dispatcher, download scheduler, and
//! block assembler only need a small set of read operations — `AlreadyHave`,
//! UTXO lookup, best-chain-work, and chain-tip change notification. This
//! crate defines that interface as a [`tower::Service`] (matching the
//! teacher's `zebra-state` request/response shape) plus a single in-memory
//! implementation. The real sled-backed store is not reproduced here.

use std::sync::Arc;

use tower::Service;

use hive_chain::{
    block::{self, Block},
    parameters::Network,
    transparent,
    work::difficulty::ExpandedDifficulty,
};

mod memory;
mod request;

pub use memory::MemoryState;
pub use request::{HashOrHeight, Request, Response};

/// A boxed, dynamically-typed error, matching the teacher's `BoxError`
/// convention used at `tower::Service` boundaries.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// An unspent transaction output, with the context needed to validate
/// coinbase-maturity and spend it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Utxo {
    pub output: transparent::Output,
    pub height: block::Height,
    pub from_coinbase: bool,
}

/// Narrow on-disk-state collaborator interface (spec §1, "Out of scope").
///
/// Implementors need only support the read operations the core subsystems
/// actually issue: `AlreadyHave(inv)` lookups in the dispatcher (§4.1),
/// UTXO lookups in the block assembler (§4.5), and best-chain-work queries
/// used by the download scheduler (§4.2) to decide whether a peer's
/// announced chain is worth syncing.
pub trait ChainTip: Send + Sync {
    /// The current best-chain tip height, or `None` before genesis.
    fn tip_height(&self) -> Option<block::Height>;

    /// The current best-chain tip hash, or `None` before genesis.
    fn tip_hash(&self) -> Option<block::Hash>;

    /// The cumulative proof-of-work of the best chain, used by the download
    /// scheduler to decide whether a peer's best-known chain is worth
    /// pursuing (spec §4.2).
    fn best_chain_work(&self) -> ExpandedDifficulty;

    /// Returns `true` if this node already has `hash` (as a tx or block),
    /// i.e. the dispatcher's `AlreadyHave(inv)` check (spec §4.1 `inv`).
    fn already_have_block(&self, hash: &block::Hash) -> bool;

    /// Looks up an unspent output by outpoint.
    fn utxo(&self, outpoint: &transparent::OutPoint) -> Option<Utxo>;
}

/// An in-memory implementation of [`ChainTip`] and the `tower::Service`
/// request/response protocol, sufficient for exercising the core
/// subsystems end to end without a real block/UTXO database.
pub struct State {
    inner: MemoryState,
}

impl State {
    pub fn new(network: Network) -> Self {
        State {
            inner: MemoryState::new(network),
        }
    }

    /// Connects `block` to the in-memory best chain, updating the UTXO set,
    /// the tip, and firing the chain-tip watch channel consumed by
    /// `g_last_tip_update` (spec §4.7).
    pub fn commit_block(&mut self, block: Arc<Block>) -> Result<(), BoxError> {
        self.inner.commit_block(block)
    }

    /// A `tokio::sync::watch` receiver that resolves whenever the tip
    /// changes height, used by the Hive watcher thread's early-abort poll
    /// (spec §4.6) and by `g_last_tip_update` (spec §4.7).
    pub fn tip_watch(&self) -> tokio::sync::watch::Receiver<Option<block::Hash>> {
        self.inner.tip_watch()
    }

    /// Looks up a committed block by hash, letting a collaborator walk the
    /// chain backwards from the tip via `previous_block_hash` (used by
    /// `hived`'s `hive_miner::ChainView` adapter to build difficulty-window
    /// and median-time-past queries without this crate needing to know
    /// about `hive-miner`).
    pub fn block_by_hash(&self, hash: &block::Hash) -> Option<Arc<Block>> {
        self.inner.block_by_hash(hash)
    }
}

impl ChainTip for State {
    fn tip_height(&self) -> Option<block::Height> {
        self.inner.tip_height()
    }

    fn tip_hash(&self) -> Option<block::Hash> {
        self.inner.tip_hash()
    }

    fn best_chain_work(&self) -> ExpandedDifficulty {
        self.inner.best_chain_work()
    }

    fn already_have_block(&self, hash: &block::Hash) -> bool {
        self.inner.already_have_block(hash)
    }

    fn utxo(&self, outpoint: &transparent::OutPoint) -> Option<Utxo> {
        self.inner.utxo(outpoint)
    }
}

impl Service<Request> for State {
    type Response = Response;
    type Error = BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Response, BoxError>> + Send + 'static>,
    >;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), BoxError>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let response = self.inner.handle(req);
        Box::pin(async move { response })
    }
}

/// Coinbase outputs may only be spent after this many confirmations,
/// mirroring `COINBASE_MATURITY` (standard Bitcoin-family value).
pub const COINBASE_MATURITY: u32 = 100;

/// Returns `true` if a coinbase output created at `created_height` may be
/// spent in a block at `spend_height`.
pub fn coinbase_is_mature(created_height: block::Height, spend_height: block::Height) -> bool {
    spend_height.0 >= created_height.0.saturating_add(COINBASE_MATURITY)
}
