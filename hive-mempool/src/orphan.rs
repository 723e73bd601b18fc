//! The Orphan Pool (spec §4.3): an at-most-bounded map of transactions
//! missing inputs at arrival time, indexed by transaction hash and
//! reverse-indexed by every spent outpoint.
//!
//! Ported in spirit (not in literal code) from
//! `net_processing.cpp`'s `mapOrphanTransactions` /
//! `mapOrphanTransactionsByPrev` and the `AddOrphanTx` / `EraseOrphanTx` /
//! `LimitOrphanTxSize` functions. The peer-misbehavior-driven eviction order
//! and the per-peer orphan quota are taken from that file verbatim; the
//! peer map itself is owned by `hive-network`'s `PeerState`, so this module
//! is parameterized over a small `PeerId` integer and accepts a
//! misbehavior-lookup closure rather than owning the peer map.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::{Duration, Instant},
};

use rand::Rng;
use thiserror::Error;

use hive_chain::{transaction, transparent::OutPoint};

/// A dense small integer identifying a peer, shared with `hive-network`'s
/// `PeerState`.
pub type PeerId = usize;

/// Per-peer orphan quota, mirroring `AddOrphanTx`'s `nOrphanCount >= 100`
/// hardening check.
pub const MAX_ORPHANS_PER_PEER: usize = 100;

/// `ORPHAN_TX_EXPIRE_TIME`: an orphan not reprocessed or evicted within this
/// long is swept on the next `sweep_expired` call.
pub const ORPHAN_TX_EXPIRE_TIME: Duration = Duration::from_secs(20 * 60);

/// `ORPHAN_TX_EXPIRE_INTERVAL`: the minimum gap between sweeps.
pub const ORPHAN_TX_EXPIRE_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// The maximum standard transaction weight; orphans at or above this are
/// rejected outright (mirrors `MAX_STANDARD_TX_WEIGHT` in `AddOrphanTx`).
pub const MAX_STANDARD_TX_WEIGHT: u64 = 400_000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrphanError {
    #[error("peer {0} has reached its orphan quota")]
    PeerQuotaExceeded(PeerId),
    #[error("orphan transaction {0:?} is too large to be relayed ({1} weight units)")]
    TooLarge(transaction::Hash, u64),
    #[error("orphan transaction {0:?} is already known")]
    Duplicate(transaction::Hash),
}

struct OrphanEntry {
    tx: Arc<hive_chain::transaction::Transaction>,
    source_peer: PeerId,
    expire_at: Instant,
}

/// The Orphan Pool.
pub struct OrphanPool {
    by_hash: HashMap<transaction::Hash, OrphanEntry>,
    by_prev: HashMap<OutPoint, HashSet<transaction::Hash>>,
    orphan_count_by_peer: HashMap<PeerId, usize>,
    next_sweep: Option<Instant>,
}

impl Default for OrphanPool {
    fn default() -> Self {
        Self::new()
    }
}

impl OrphanPool {
    pub fn new() -> Self {
        OrphanPool {
            by_hash: HashMap::new(),
            by_prev: HashMap::new(),
            orphan_count_by_peer: HashMap::new(),
            next_sweep: None,
        }
    }

    pub fn len(&self) -> usize {
        self.by_hash.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty()
    }

    pub fn contains(&self, hash: &transaction::Hash) -> bool {
        self.by_hash.contains_key(hash)
    }

    /// The number of orphans whose `source_peer` is `peer`, maintained
    /// incrementally (spec invariant: "Per-peer orphan count equals the
    /// number of pool entries whose source-peer matches it").
    pub fn orphan_count(&self, peer: PeerId) -> usize {
        self.orphan_count_by_peer.get(&peer).copied().unwrap_or(0)
    }

    /// `AddOrphanTx`: insert `tx`, reverse-indexing each input's outpoint.
    /// Rejects a peer that already owns [`MAX_ORPHANS_PER_PEER`] orphans, a
    /// duplicate hash, or a transaction at/above [`MAX_STANDARD_TX_WEIGHT`].
    pub fn add(
        &mut self,
        tx: Arc<hive_chain::transaction::Transaction>,
        source_peer: PeerId,
        now: Instant,
    ) -> Result<(), OrphanError> {
        if self.orphan_count(source_peer) >= MAX_ORPHANS_PER_PEER {
            return Err(OrphanError::PeerQuotaExceeded(source_peer));
        }

        let hash = tx.hash();
        if self.by_hash.contains_key(&hash) {
            return Err(OrphanError::Duplicate(hash));
        }

        let weight = tx.len() as u64 * 4;
        if weight >= MAX_STANDARD_TX_WEIGHT {
            return Err(OrphanError::TooLarge(hash, weight));
        }

        for input in &tx.inputs {
            if let hive_chain::transparent::Input::PrevOut { outpoint, .. } = input {
                self.by_prev.entry(*outpoint).or_default().insert(hash);
            }
        }

        self.by_hash.insert(
            hash,
            OrphanEntry {
                tx,
                source_peer,
                expire_at: now + ORPHAN_TX_EXPIRE_TIME,
            },
        );
        *self.orphan_count_by_peer.entry(source_peer).or_insert(0) += 1;

        Ok(())
    }

    /// `EraseOrphanTx`: remove `hash`, cleaning up the reverse index and
    /// decrementing the source peer's orphan count. Returns `true` if an
    /// entry was removed.
    pub fn erase(&mut self, hash: &transaction::Hash) -> bool {
        let entry = match self.by_hash.remove(hash) {
            Some(entry) => entry,
            None => return false,
        };

        if let Some(count) = self.orphan_count_by_peer.get_mut(&entry.source_peer) {
            *count = count.saturating_sub(1);
        }

        for input in &entry.tx.inputs {
            if let hive_chain::transparent::Input::PrevOut { outpoint, .. } = input {
                if let Some(set) = self.by_prev.get_mut(outpoint) {
                    set.remove(hash);
                    if set.is_empty() {
                        self.by_prev.remove(outpoint);
                    }
                }
            }
        }

        true
    }

    /// `EraseOrphansFor(peer)`: remove every orphan sourced by `peer`,
    /// called when a peer's connection finalizes (spec §3 Lifecycles).
    pub fn erase_for_peer(&mut self, peer: PeerId) -> usize {
        let hashes: Vec<_> = self
            .by_hash
            .iter()
            .filter(|(_, entry)| entry.source_peer == peer)
            .map(|(hash, _)| *hash)
            .collect();
        let erased = hashes.len();
        for hash in hashes {
            self.erase(&hash);
        }
        erased
    }

    /// Every orphan hash consuming `outpoint`, used to reprocess orphans
    /// after a new mempool acceptance (spec §4.3 Reprocessing contract).
    pub fn orphans_spending(&self, outpoint: &OutPoint) -> Vec<Arc<hive_chain::transaction::Transaction>> {
        self.by_prev
            .get(outpoint)
            .into_iter()
            .flatten()
            .filter_map(|hash| self.by_hash.get(hash).map(|e| e.tx.clone()))
            .collect()
    }

    /// The peer that sourced `hash`, if still present.
    pub fn source_peer(&self, hash: &transaction::Hash) -> Option<PeerId> {
        self.by_hash.get(hash).map(|e| e.source_peer)
    }

    /// Sweeps expired entries if at least [`ORPHAN_TX_EXPIRE_INTERVAL`] has
    /// elapsed since the last sweep, rescheduling the next sweep for the
    /// earliest survivor's expiry (mirrors `LimitOrphanTxSize`'s sweep
    /// phase).
    pub fn sweep_expired(&mut self, now: Instant) -> usize {
        if let Some(next_sweep) = self.next_sweep {
            if next_sweep > now {
                return 0;
            }
        }

        let expired: Vec<_> = self
            .by_hash
            .iter()
            .filter(|(_, entry)| entry.expire_at <= now)
            .map(|(hash, _)| *hash)
            .collect();
        let erased = expired.len();
        for hash in expired {
            self.erase(&hash);
        }

        let min_expiry = self.by_hash.values().map(|e| e.expire_at).min();
        self.next_sweep = Some(
            min_expiry.unwrap_or(now + ORPHAN_TX_EXPIRE_INTERVAL) + ORPHAN_TX_EXPIRE_INTERVAL
                - ORPHAN_TX_EXPIRE_TIME,
        );

        erased
    }

    /// `LimitOrphanTxSize`'s eviction phase: while over `max`, repeatedly
    /// erase the orphan belonging to the highest-misbehavior peer; on a
    /// tie (or no misbehaving peer) fall back to a randomized selection.
    /// `misbehavior` supplies each peer's current score from the caller's
    /// `PeerState` map.
    pub fn limit_size(&mut self, max: usize, misbehavior: impl Fn(PeerId) -> u32) -> usize {
        let mut evicted = 0;
        while self.by_hash.len() > max {
            let worst = self
                .by_hash
                .iter()
                .map(|(hash, entry)| (*hash, misbehavior(entry.source_peer)))
                .max_by_key(|(_, score)| *score);

            let to_erase = match worst {
                Some((hash, score)) if score > 0 => hash,
                _ => {
                    // Randomized fallback: pick the first hash at or after a
                    // random point in hash-space, wrapping to the first
                    // entry (mirrors `mapOrphanTransactions.lower_bound`).
                    let mut random_bytes = [0u8; 32];
                    rand::thread_rng().fill(&mut random_bytes);
                    let random_hash = transaction::Hash(random_bytes);
                    self.by_hash
                        .keys()
                        .filter(|h| **h >= random_hash)
                        .min()
                        .copied()
                        .or_else(|| self.by_hash.keys().min().copied())
                        .expect("pool is non-empty")
                }
            };

            self.erase(&to_erase);
            evicted += 1;
        }
        evicted
    }
}
