//! Per-peer state: identity, sync progress, in-flight downloads,
//! misbehavior scoring, negotiated features, and the rate-limit and
//! introspection trackers the dispatcher consults.

mod rate_window;

pub mod dispatch;

use std::collections::HashMap;
use std::time::Instant;

use primitive_types::U256;

pub use hive_mempool::orphan::PeerId;
pub use rate_window::RateWindow;

use hive_chain::block;

/// A peer's cumulative misbehavior score. Reaching
/// [`crate::constants::DOS_SCORE_BAN_THRESHOLD`] schedules a ban.
pub type DosScore = u32;

/// How a connection to a peer was established.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Direction {
    Inbound,
    Outbound,
    /// A short-lived connection made only to confirm an address is alive.
    Feeler,
    /// Established by explicit operator configuration; exempt from several
    /// eviction policies.
    Manual,
}

/// A block queued for download from a particular peer. Also reachable
/// through the scheduler's process-wide `hash -> peer` index.
#[derive(Clone, Debug)]
pub struct QueuedBlock {
    pub hash: block::Hash,
    pub height: Option<block::Height>,
    pub validated_headers: bool,
    pub requested_at: Instant,
}

/// Chain-sync watchdog state: detects an outbound peer whose advertised
/// chain work never catches up to a recorded snapshot within
/// [`crate::constants::CHAIN_SYNC_TIMEOUT`].
#[derive(Clone, Debug, Default)]
pub struct ChainSyncWatchdog {
    pub timeout_deadline: Option<Instant>,
    pub work_header_snapshot: Option<U256>,
    pub sent_getheaders: bool,
    pub protect_from_eviction: bool,
}

/// Negotiated protocol features, set while processing `version`/`verack`
/// and the optional messages that may follow.
#[derive(Clone, Debug, Default)]
pub struct Negotiation {
    pub prefers_headers: bool,
    pub prefers_compact_announcements: bool,
    pub wants_compact_witness: bool,
    pub supports_desired_compact_version: bool,
    pub has_witness_service: bool,
}

/// Sliding-window and session counters the dispatcher consults before
/// honoring a request.
#[derive(Clone, Debug)]
pub struct RateLimits {
    pub inv: RateWindow,
    pub getheaders: RateWindow,
    pub addr: RateWindow,
    pub notfound: RateWindow,
    pub reject: RateWindow,
    pub filterload: RateWindow,
    pub mempool: RateWindow,
    pub sendcmpct_count: usize,
}

impl Default for RateLimits {
    fn default() -> Self {
        use crate::constants::*;
        RateLimits {
            inv: RateWindow::new(INV_RATE_LIMIT_WINDOW),
            getheaders: RateWindow::new(GETHEADERS_RATE_LIMIT_WINDOW),
            addr: RateWindow::new(ADDR_RATE_LIMIT_WINDOW),
            notfound: RateWindow::new(NOTFOUND_RATE_LIMIT_WINDOW),
            reject: RateWindow::new(REJECT_RATE_LIMIT_WINDOW),
            filterload: RateWindow::new(FILTERLOAD_RATE_LIMIT_WINDOW),
            mempool: RateWindow::new(MEMPOOL_RATE_LIMIT_WINDOW),
            sendcmpct_count: 0,
        }
    }
}

/// Introspection hardening counters: repeated borderline-suspicious but not
/// outright invalid behavior (excess `getheaders`, stale-fork announcements)
/// accrues here and disconnects the peer once it crosses a threshold,
/// independent of the ordinary misbehavior score.
#[derive(Clone, Debug, Default)]
pub struct Introspection {
    pub recent_header_requests: usize,
    pub stale_fork_announcements: usize,
    pub score: u32,
    pub last_introspection: Option<Instant>,
}

impl Introspection {
    pub const DISCONNECT_THRESHOLD: u32 = 100;

    /// Adds `amount` to the introspection score; returns `true` if the peer
    /// has now crossed the disconnect threshold.
    pub fn add(&mut self, amount: u32, now: Instant) -> bool {
        self.score += amount;
        self.last_introspection = Some(now);
        self.score >= Self::DISCONNECT_THRESHOLD
    }
}

/// One active peer's complete state (spec §3 `PeerState`).
#[derive(Clone, Debug)]
pub struct PeerState {
    pub id: PeerId,
    pub direction: Direction,
    pub services: crate::protocol::external::types::PeerServices,
    pub whitelisted: bool,
    pub protocol_version: Option<crate::protocol::external::types::ProtocolVersion>,

    pub best_known_header: Option<block::Hash>,
    pub last_common_ancestor: Option<block::Hash>,
    pub best_header_sent: Option<block::Hash>,
    pub last_unknown_announcement: Option<block::Hash>,

    pub in_flight: Vec<QueuedBlock>,
    pub earliest_request: Option<Instant>,
    pub stalling_since: Option<Instant>,

    pub misbehavior: DosScore,
    pub should_ban: bool,

    pub negotiation: Negotiation,
    pub watchdog: ChainSyncWatchdog,
    pub rate_limits: RateLimits,
    pub introspection: Introspection,

    pub orphan_count: usize,
    pub pong_mismatch_count: usize,
    /// The nonce of a `ping` sent to this peer that hasn't been answered
    /// yet, set by [`dispatch::Dispatcher::send_ping`]. `None` means there
    /// is no ping outstanding, so a `pong` arriving now is unsolicited.
    pub outstanding_ping_nonce: Option<crate::protocol::external::types::Nonce>,
    pub last_block_announcement: Option<Instant>,

    pub handshake_complete: bool,
    pub sent_version: bool,
    pub received_verack: bool,
    pub unconnecting_headers: usize,
    pub known_inv: HashMap<hive_chain::transaction::Hash, Instant>,
}

impl PeerState {
    pub fn new(id: PeerId, direction: Direction) -> Self {
        PeerState {
            id,
            direction,
            services: crate::protocol::external::types::PeerServices::empty(),
            whitelisted: false,
            protocol_version: None,
            best_known_header: None,
            last_common_ancestor: None,
            best_header_sent: None,
            last_unknown_announcement: None,
            in_flight: Vec::new(),
            earliest_request: None,
            stalling_since: None,
            misbehavior: 0,
            should_ban: false,
            negotiation: Negotiation::default(),
            watchdog: ChainSyncWatchdog::default(),
            rate_limits: RateLimits::default(),
            introspection: Introspection::default(),
            orphan_count: 0,
            pong_mismatch_count: 0,
            outstanding_ping_nonce: None,
            last_block_announcement: None,
            handshake_complete: false,
            sent_version: false,
            received_verack: false,
            unconnecting_headers: 0,
            known_inv: HashMap::new(),
        }
    }

    /// Adds `amount` to this peer's misbehavior score, scheduling a ban once
    /// [`crate::constants::DOS_SCORE_BAN_THRESHOLD`] is reached. Returns
    /// `true` if the peer should now be disconnected.
    pub fn misbehaving(&mut self, amount: DosScore) -> bool {
        self.misbehavior = self.misbehavior.saturating_add(amount);
        if self.misbehavior >= crate::constants::DOS_SCORE_BAN_THRESHOLD {
            self.should_ban = true;
        }
        self.should_ban
    }

    pub fn is_protected_from_eviction(&self) -> bool {
        matches!(self.direction, Direction::Manual) || self.watchdog.protect_from_eviction
    }

    pub fn is_outbound(&self) -> bool {
        matches!(self.direction, Direction::Outbound | Direction::Feeler)
    }

    /// Count of in-flight entries with `validated_headers` set, used to
    /// maintain the process-wide "peers with validated downloads" count.
    pub fn validated_in_flight(&self) -> usize {
        self.in_flight.iter().filter(|b| b.validated_headers).count()
    }
}

/// All active peers, keyed by [`PeerId`]. Owns the process-wide
/// `BlocksInFlight` index required by the spec invariant that every
/// in-flight hash maps to exactly one entry of exactly one peer.
#[derive(Default)]
pub struct PeerTable {
    peers: HashMap<PeerId, PeerState>,
    blocks_in_flight: HashMap<block::Hash, PeerId>,
    next_id: PeerId,
}

impl PeerTable {
    pub fn new() -> Self {
        PeerTable::default()
    }

    pub fn insert(&mut self, direction: Direction) -> PeerId {
        let id = self.next_id;
        self.next_id += 1;
        self.peers.insert(id, PeerState::new(id, direction));
        id
    }

    pub fn get(&self, id: PeerId) -> Option<&PeerState> {
        self.peers.get(&id)
    }

    pub fn get_mut(&mut self, id: PeerId) -> Option<&mut PeerState> {
        self.peers.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PeerId, &PeerState)> {
        self.peers.iter()
    }

    pub fn peers_with_validated_downloads(&self) -> usize {
        self.peers.values().filter(|p| p.validated_in_flight() > 0).count()
    }

    /// Marks `hash` in flight to `peer`. The caller is responsible for also
    /// pushing the matching [`QueuedBlock`] onto that peer's `in_flight`
    /// list; this only maintains the reverse index.
    pub fn mark_in_flight(&mut self, hash: block::Hash, peer: PeerId) {
        self.blocks_in_flight.insert(hash, peer);
    }

    pub fn in_flight_owner(&self, hash: &block::Hash) -> Option<PeerId> {
        self.blocks_in_flight.get(hash).copied()
    }

    pub fn clear_in_flight(&mut self, hash: &block::Hash) {
        self.blocks_in_flight.remove(hash);
    }

    /// Destroys a peer's state on finalize (spec §3 Lifecycles): removes
    /// every in-flight block it owned from `BlocksInFlight` and drops the
    /// peer entry itself. Orphan cleanup and mempool bookkeeping are the
    /// caller's responsibility, since the orphan pool isn't owned here.
    pub fn remove(&mut self, id: PeerId) -> Option<PeerState> {
        let peer = self.peers.remove(&id)?;
        for queued in &peer.in_flight {
            if self.blocks_in_flight.get(&queued.hash) == Some(&id) {
                self.blocks_in_flight.remove(&queued.hash);
            }
        }
        Some(peer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn misbehaving_schedules_ban_at_threshold() {
        let mut peer = PeerState::new(0, Direction::Inbound);
        assert!(!peer.misbehaving(50));
        assert!(!peer.should_ban);
        assert!(peer.misbehaving(50));
        assert!(peer.should_ban);
    }

    #[test]
    fn peer_table_tracks_blocks_in_flight_and_cleans_up_on_remove() {
        let mut table = PeerTable::new();
        let id = table.insert(Direction::Outbound);
        let hash = block::Hash([7; 32]);

        table.mark_in_flight(hash, id);
        table.get_mut(id).unwrap().in_flight.push(QueuedBlock {
            hash,
            height: None,
            validated_headers: false,
            requested_at: Instant::now(),
        });

        assert_eq!(table.in_flight_owner(&hash), Some(id));
        table.remove(id);
        assert_eq!(table.in_flight_owner(&hash), None);
    }
}
