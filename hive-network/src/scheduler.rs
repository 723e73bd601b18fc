//! The Download Scheduler (spec §4.2): block selection within the sliding
//! window ahead of a peer's last common ancestor, plus stall and timeout
//! detection.

use std::time::{Duration, Instant};

use hive_chain::block;

use crate::constants;
use crate::peer::{PeerId, PeerState, PeerTable, QueuedBlock};

/// A narrow view onto the active chain that the scheduler needs: whether a
/// candidate hash is already part of it, and how to walk from a common
/// ancestor up to a peer's best-known header. The real implementation lives
/// in the chain-state collaborator; this crate only depends on the
/// interface it needs.
pub trait ChainView {
    /// `true` if `hash` is already contained in the active chain.
    fn contains(&self, hash: &block::Hash) -> bool;

    /// Successor hashes of `ancestor` along the peer's best-known chain, in
    /// height order, stopping once `max` hashes have been produced or
    /// `best_known_header` is reached.
    fn successors(
        &self,
        ancestor: block::Hash,
        best_known_header: block::Hash,
        max: usize,
    ) -> Vec<block::Hash>;
}

/// Why the scheduler could not select any further blocks from a peer right
/// now.
#[derive(Debug, Eq, PartialEq)]
pub enum SchedulerStall {
    /// Every successor candidate lies beyond `[common+1, common+BLOCK_DOWNLOAD_WINDOW]`;
    /// this peer is the "waiting-for" staller reported to the caller.
    WindowExhausted,
    /// The peer has no known successors past its last common ancestor.
    NoCandidates,
}

pub struct DownloadScheduler;

impl DownloadScheduler {
    /// Selects up to `count` successor blocks of `peer`'s last common
    /// ancestor that are not yet in flight anywhere, honoring the
    /// `[common+1, common+BLOCK_DOWNLOAD_WINDOW]` scheduling window.
    /// Advances `peer.last_common_ancestor` past any candidate already
    /// contained in the active chain.
    pub fn select_blocks(
        chain: &impl ChainView,
        peers: &mut PeerTable,
        peer_id: PeerId,
        count: usize,
    ) -> Result<Vec<block::Hash>, SchedulerStall> {
        let (ancestor, best_known) = {
            let peer = peers.get(peer_id).expect("peer exists");
            match (peer.last_common_ancestor, peer.best_known_header) {
                (Some(a), Some(b)) => (a, b),
                _ => return Err(SchedulerStall::NoCandidates),
            }
        };

        let mut selected = Vec::new();
        let mut common = ancestor;
        let mut window_exhausted = false;

        while selected.len() < count {
            let tranche = (count - selected.len()).max(128);
            let candidates = chain.successors(common, best_known, tranche);
            if candidates.is_empty() {
                break;
            }

            let mut advanced = false;
            for (offset, candidate) in candidates.into_iter().enumerate() {
                if chain.contains(&candidate) {
                    common = candidate;
                    advanced = true;
                    continue;
                }

                if offset as u32 >= constants::BLOCK_DOWNLOAD_WINDOW {
                    window_exhausted = true;
                    break;
                }

                if peers.in_flight_owner(&candidate).is_none() {
                    selected.push(candidate);
                }
            }

            if window_exhausted || !advanced && selected.is_empty() {
                break;
            }
        }

        if let Some(peer) = peers.get_mut(peer_id) {
            peer.last_common_ancestor = Some(common);
        }

        if selected.is_empty() && window_exhausted {
            return Err(SchedulerStall::WindowExhausted);
        }

        for hash in &selected {
            peers.mark_in_flight(*hash, peer_id);
        }
        if let Some(peer) = peers.get_mut(peer_id) {
            let now = Instant::now();
            if peer.in_flight.is_empty() {
                peer.earliest_request = Some(now);
            }
            for hash in &selected {
                peer.in_flight.push(QueuedBlock {
                    hash: *hash,
                    height: None,
                    validated_headers: false,
                    requested_at: now,
                });
            }
        }

        Ok(selected)
    }

    /// `true` if `peer` has been stalling past [`constants::BLOCK_STALLING_TIMEOUT`].
    pub fn is_stalling(peer: &PeerState, now: Instant) -> bool {
        matches!(peer.stalling_since, Some(since) if now.duration_since(since) >= constants::BLOCK_STALLING_TIMEOUT)
    }

    /// `true` if `peer`'s in-flight download has exceeded its per-peer
    /// scaled timeout, given the number of other validated-download peers.
    pub fn has_exceeded_download_timeout(
        peer: &PeerState,
        now: Instant,
        other_validated_download_peers: usize,
    ) -> bool {
        let earliest = match peer.earliest_request {
            Some(t) => t,
            None => return false,
        };
        if peer.in_flight.is_empty() {
            return false;
        }

        let timeout = constants::BLOCK_DOWNLOAD_TIMEOUT_BASE
            + constants::BLOCK_DOWNLOAD_TIMEOUT_PER_PEER * other_validated_download_peers as u32;
        now.duration_since(earliest) >= timeout
    }

    /// Headers-sync watchdog: `true` if `peer` has exceeded its headers-sync
    /// deadline, the local best-header is stale (older than 24h), and at
    /// least one other preferred-download peer exists. Whitelisted peers are
    /// exempt (the caller should clear `sent_getheaders` for them instead of
    /// disconnecting).
    pub fn headers_sync_watchdog_expired(
        peer: &PeerState,
        now: Instant,
        best_header_age: Duration,
        other_preferred_peers: usize,
    ) -> bool {
        if peer.whitelisted {
            return false;
        }
        let expired = matches!(peer.watchdog.timeout_deadline, Some(deadline) if now >= deadline);
        expired && best_header_age >= Duration::from_secs(24 * 60 * 60) && other_preferred_peers > 0
    }

    /// Chain-sync timeout (spec §4.2): an outbound, non-protected peer whose
    /// best-known work hasn't caught up to its recorded work-header
    /// snapshot within [`constants::CHAIN_SYNC_TIMEOUT`] should receive a
    /// targeted `getheaders`; [`constants::HEADERS_RESPONSE_TIME`] after
    /// that without progress, it should be disconnected.
    pub fn chain_sync_timeout_action(
        peer: &PeerState,
        now: Instant,
        caught_up: bool,
    ) -> ChainSyncAction {
        if caught_up || peer.is_protected_from_eviction() || !peer.is_outbound() {
            return ChainSyncAction::None;
        }
        let deadline = match peer.watchdog.timeout_deadline {
            Some(d) => d,
            None => return ChainSyncAction::None,
        };

        if now < deadline {
            ChainSyncAction::None
        } else if !peer.watchdog.sent_getheaders {
            ChainSyncAction::SendGetHeaders
        } else if now.duration_since(deadline) >= constants::HEADERS_RESPONSE_TIME {
            ChainSyncAction::Disconnect
        } else {
            ChainSyncAction::None
        }
    }
}

#[derive(Debug, Eq, PartialEq)]
pub enum ChainSyncAction {
    None,
    SendGetHeaders,
    Disconnect,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peer::Direction;
    use std::collections::HashSet;

    struct FakeChain {
        chain: HashSet<block::Hash>,
        successors: Vec<block::Hash>,
    }

    impl ChainView for FakeChain {
        fn contains(&self, hash: &block::Hash) -> bool {
            self.chain.contains(hash)
        }

        fn successors(&self, _ancestor: block::Hash, _best: block::Hash, max: usize) -> Vec<block::Hash> {
            self.successors.iter().take(max).copied().collect()
        }
    }

    #[test]
    fn selects_successors_not_already_in_flight() {
        let mut peers = PeerTable::new();
        let id = peers.insert(Direction::Outbound);
        {
            let peer = peers.get_mut(id).unwrap();
            peer.last_common_ancestor = Some(block::Hash([0; 32]));
            peer.best_known_header = Some(block::Hash([9; 32]));
        }

        let chain = FakeChain {
            chain: HashSet::new(),
            successors: vec![block::Hash([1; 32]), block::Hash([2; 32])],
        };

        let selected = DownloadScheduler::select_blocks(&chain, &mut peers, id, 2).unwrap();
        assert_eq!(selected.len(), 2);
        assert_eq!(peers.in_flight_owner(&block::Hash([1; 32])), Some(id));
    }

    #[test]
    fn is_stalling_after_timeout() {
        let mut peer = PeerState::new(0, Direction::Outbound);
        let t0 = Instant::now();
        peer.stalling_since = Some(t0);
        assert!(!DownloadScheduler::is_stalling(&peer, t0));
        assert!(DownloadScheduler::is_stalling(
            &peer,
            t0 + constants::BLOCK_STALLING_TIMEOUT + Duration::from_secs(1)
        ));
    }
}
