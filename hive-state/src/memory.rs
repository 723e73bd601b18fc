//! An in-memory `ChainTip` implementation.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::watch;

use hive_chain::{
    block::{self, Block},
    parameters::Network,
    transparent,
    work::difficulty::ExpandedDifficulty,
};

use crate::{BoxError, HashOrHeight, Request, Response, Utxo};

/// An in-memory chain state: the UTXO set, a hash-addressed block index,
/// and the current tip. No pruning, no persistence — this exists to let the
/// core subsystems (dispatcher, assembler, scheduler) be exercised without
/// a real on-disk database, per spec §1's framing of the state database as
/// an external collaborator.
pub struct MemoryState {
    network: Network,
    blocks_by_hash: HashMap<block::Hash, Arc<Block>>,
    height_by_hash: HashMap<block::Hash, block::Height>,
    utxos: HashMap<transparent::OutPoint, Utxo>,
    tip: Option<(block::Height, block::Hash)>,
    cumulative_work: ExpandedDifficulty,
    tip_tx: watch::Sender<Option<block::Hash>>,
    tip_rx: watch::Receiver<Option<block::Hash>>,
}

impl MemoryState {
    pub fn new(network: Network) -> Self {
        let (tip_tx, tip_rx) = watch::channel(None);
        MemoryState {
            network,
            blocks_by_hash: HashMap::new(),
            height_by_hash: HashMap::new(),
            utxos: HashMap::new(),
            tip: None,
            cumulative_work: ExpandedDifficulty::target_difficulty_limit(network),
            tip_tx,
            tip_rx,
        }
    }

    pub fn tip_watch(&self) -> watch::Receiver<Option<block::Hash>> {
        self.tip_rx.clone()
    }

    pub fn tip_height(&self) -> Option<block::Height> {
        self.tip.map(|(height, _)| height)
    }

    pub fn tip_hash(&self) -> Option<block::Hash> {
        self.tip.map(|(_, hash)| hash)
    }

    pub fn best_chain_work(&self) -> ExpandedDifficulty {
        self.cumulative_work
    }

    pub fn already_have_block(&self, hash: &block::Hash) -> bool {
        self.blocks_by_hash.contains_key(hash)
    }

    pub fn utxo(&self, outpoint: &transparent::OutPoint) -> Option<Utxo> {
        self.utxos.get(outpoint).cloned()
    }

    pub fn block_by_hash(&self, hash: &block::Hash) -> Option<Arc<Block>> {
        self.blocks_by_hash.get(hash).cloned()
    }

    /// Connects `block` on top of the current tip: records its hash/height,
    /// spends the inputs its transactions reference, creates its new
    /// outputs, and advances `tip`. There is no reorg handling — an
    /// in-memory approximation is all the four core subsystems need.
    pub fn commit_block(&mut self, block: Arc<Block>) -> Result<(), BoxError> {
        let hash = block.hash();
        let height = block
            .coinbase_height()
            .map(block::Height)
            .ok_or("block has no coinbase height")?;

        for tx in &block.transactions {
            if !tx.is_coinbase() {
                for input in &tx.inputs {
                    if let transparent::Input::PrevOut { outpoint, .. } = input {
                        self.utxos.remove(outpoint);
                    }
                }
            }
            for (index, output) in tx.outputs.iter().enumerate() {
                let outpoint = transparent::OutPoint {
                    hash: tx.hash(),
                    index: index as u32,
                };
                self.utxos.insert(
                    outpoint,
                    Utxo {
                        output: output.clone(),
                        height,
                        from_coinbase: tx.is_coinbase(),
                    },
                );
            }
        }

        self.height_by_hash.insert(hash, height);
        self.blocks_by_hash.insert(hash, block);
        self.tip = Some((height, hash));
        let _ = self.tip_tx.send(Some(hash));

        Ok(())
    }

    pub fn handle(&mut self, request: Request) -> Result<Response, BoxError> {
        match request {
            Request::CommitBlock(block) => {
                self.commit_block(block)?;
                Ok(Response::Committed(self.tip_hash().expect("just committed")))
            }
            Request::Utxo(outpoint) => Ok(Response::Utxo(self.utxo(&outpoint))),
            Request::Tip => Ok(Response::Tip(self.tip)),
            Request::BestChainWork => Ok(Response::BestChainWork(self.best_chain_work())),
            Request::Contains(HashOrHeight::Hash(hash)) => {
                Ok(Response::Contains(self.already_have_block(&hash)))
            }
            Request::Contains(HashOrHeight::Height(height)) => Ok(Response::Contains(
                self.tip_height().map_or(false, |tip| height.0 <= tip.0),
            )),
        }
    }
}
