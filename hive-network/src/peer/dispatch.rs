//! The Message Dispatcher (spec §4.1): turns an inbound [`Message`] plus the
//! sending peer's state into state transitions and outbound effects,
//! enforcing the handshake ordering, per-message caps, and rate limits.

use std::time::Instant;

use thiserror::Error;

use hive_chain::block;

use crate::constants;
use crate::protocol::external::types::PeerServices;
use crate::protocol::external::{Message, RejectReason};

use super::{DosScore, Negotiation, PeerId, PeerState, PeerTable, QueuedBlock};

/// Failure modes of a single dispatcher call. The caller decides whether to
/// reject, disconnect, or both; the dispatcher never disconnects directly.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatcherError {
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    #[error("oversize {kind}: {len} entries (max {max})")]
    Oversize {
        kind: &'static str,
        len: usize,
        max: usize,
    },
    #[error("rate limited: {0}")]
    RateLimited(&'static str),
    #[error("protocol violation, dos score +{0}")]
    ProtocolViolation(DosScore),
    #[error("peer {0} is unknown")]
    UnknownPeer(PeerId),
    #[error("message received before handshake completed")]
    HandshakeNotStarted,
}

/// Side effects produced by handling one message: messages to send back to
/// the originating peer, and whether the caller should disconnect it.
#[derive(Debug, Default)]
pub struct Effects {
    pub send: Vec<Message>,
    pub disconnect: bool,
}

impl Effects {
    fn send(message: Message) -> Self {
        Effects {
            send: vec![message],
            disconnect: false,
        }
    }

    fn none() -> Self {
        Effects::default()
    }

    fn disconnecting() -> Self {
        Effects {
            send: Vec::new(),
            disconnect: true,
        }
    }
}

fn reject(command: &'static str, ccode: RejectReason, reason: &str) -> Message {
    Message::Reject {
        message: command.to_string(),
        ccode,
        reason: reason.to_string(),
        data: None,
    }
}

/// Drives peer state transitions from inbound messages. Holds the peer
/// table; the orphan pool, mempool, and chain collaborators are passed in
/// by reference at each call site rather than owned here, since (per spec
/// §2) they're separate components the dispatcher only consults.
pub struct Dispatcher {
    pub peers: PeerTable,
}

impl Dispatcher {
    pub fn new() -> Self {
        Dispatcher {
            peers: PeerTable::new(),
        }
    }

    fn peer_mut(&mut self, id: PeerId) -> Result<&mut PeerState, DispatcherError> {
        self.peers.get_mut(id).ok_or(DispatcherError::UnknownPeer(id))
    }

    /// Entry point: routes `message` to its per-command handler, enforcing
    /// the handshake ordering common to all of them first.
    pub fn dispatch(
        &mut self,
        id: PeerId,
        message: Message,
        now: Instant,
    ) -> Result<Effects, DispatcherError> {
        {
            let peer = self.peer_mut(id)?;
            let is_handshake_message = matches!(
                message,
                Message::Version(_) | Message::Verack | Message::SendHeaders
            ) || (matches!(message, Message::SendCompact(_)) && !peer.handshake_complete);

            if !peer.sent_version && !matches!(message, Message::Version(_)) {
                peer.misbehaving(constants::DOS_SCORE_PROTOCOL_VIOLATION);
                return Err(DispatcherError::HandshakeNotStarted);
            }
            if peer.sent_version
                && !peer.received_verack
                && !is_handshake_message
                && !matches!(message, Message::GetAddr)
            {
                peer.misbehaving(constants::DOS_SCORE_PROTOCOL_VIOLATION);
                return Err(DispatcherError::ProtocolViolation(
                    constants::DOS_SCORE_PROTOCOL_VIOLATION,
                ));
            }
        }

        match message {
            Message::Version(version) => self.handle_version(id, version),
            Message::Verack => self.handle_verack(id),
            Message::Addr(addrs) => self.handle_addr(id, addrs, now),
            Message::Inv(items) => self.handle_inv(id, items, now),
            Message::GetData(items) => self.handle_getdata(id, items),
            Message::GetHeaders(request) => self.handle_getheaders(id, request, now),
            Message::Headers(headers) => self.handle_headers(id, headers, now),
            Message::Ping(nonce) => Ok(Effects::send(Message::Pong(nonce))),
            Message::Pong(nonce) => self.handle_pong(id, nonce),
            Message::FilterLoad {
                filter,
                hash_functions_count,
                tweak,
                flags,
            } => self.handle_filterload(id, filter, hash_functions_count, tweak, flags, now),
            Message::FilterAdd { data } => self.handle_filteradd(id, data),
            Message::FilterClear => Ok(Effects::none()),
            Message::Mempool => self.handle_mempool(id, now),
            Message::SendCompact(sendcmpct) => self.handle_sendcmpct(id, sendcmpct),
            Message::NotFound(items) => self.handle_notfound(id, items, now),
            Message::Reject { .. } => self.handle_reject(id, now),
            // Remaining commands (block/tx/cmpctblock/blocktxn/getblocks/
            // feefilter/getaddr) are accepted unconditionally at this layer;
            // their semantics depend on the chain/mempool collaborators and
            // are driven by the scheduler and the inbound service wiring.
            _ => Ok(Effects::none()),
        }
    }

    fn handle_version(&mut self, id: PeerId, version: crate::protocol::external::Version) -> Result<Effects, DispatcherError> {
        let peer = self.peer_mut(id)?;
        if peer.sent_version {
            peer.misbehaving(constants::DOS_SCORE_PROTOCOL_VIOLATION);
            return Err(DispatcherError::ProtocolViolation(
                constants::DOS_SCORE_PROTOCOL_VIOLATION,
            ));
        }
        peer.sent_version = true;

        if version.version < constants::MIN_PEER_VERSION {
            return Ok(Effects {
                send: vec![reject(
                    "version",
                    RejectReason::Obsolete,
                    "obsolete version",
                )],
                disconnect: true,
            });
        }

        peer.protocol_version = Some(version.version);
        peer.services = version.services;
        if matches!(peer.direction, super::Direction::Feeler) {
            return Ok(Effects::disconnecting());
        }

        Ok(Effects::send(Message::Verack))
    }

    fn handle_verack(&mut self, id: PeerId) -> Result<Effects, DispatcherError> {
        let peer = self.peer_mut(id)?;
        peer.received_verack = true;
        peer.handshake_complete = true;

        let version = peer.protocol_version.unwrap_or(constants::MIN_PEER_VERSION);
        let mut send = Vec::new();
        if version >= constants::SENDHEADERS_VERSION {
            send.push(Message::SendHeaders);
            peer.negotiation.prefers_headers = true;
        }
        if version >= constants::SHORT_IDS_BLOCKS_VERSION {
            peer.negotiation.supports_desired_compact_version = true;
        }

        Ok(Effects { send, disconnect: false })
    }

    fn handle_addr(
        &mut self,
        id: PeerId,
        addrs: Vec<crate::meta_addr::MetaAddr>,
        now: Instant,
    ) -> Result<Effects, DispatcherError> {
        if addrs.len() > 1000 {
            let peer = self.peer_mut(id)?;
            peer.misbehaving(constants::DOS_SCORE_PROTOCOL_VIOLATION);
            return Err(DispatcherError::Oversize {
                kind: "addr",
                len: addrs.len(),
                max: 1000,
            });
        }

        let peer = self.peer_mut(id)?;
        let total = peer.rate_limits.addr.record(addrs.len(), now);
        if total > constants::MAX_ADDR_PER_MINUTE {
            peer.misbehaving(constants::DOS_SCORE_PROTOCOL_VIOLATION);
            return Err(DispatcherError::RateLimited("addr"));
        }

        Ok(Effects::none())
    }

    fn handle_inv(
        &mut self,
        id: PeerId,
        items: Vec<crate::protocol::external::InventoryHash>,
        now: Instant,
    ) -> Result<Effects, DispatcherError> {
        if items.len() > constants::MAX_INV_SZ {
            let peer = self.peer_mut(id)?;
            peer.misbehaving(constants::DOS_SCORE_PROTOCOL_VIOLATION);
            return Err(DispatcherError::Oversize {
                kind: "inv",
                len: items.len(),
                max: constants::MAX_INV_SZ,
            });
        }

        let peer = self.peer_mut(id)?;
        let total = peer.rate_limits.inv.record(items.len(), now);
        if total > constants::MAX_INV_PER_MINUTE {
            peer.misbehaving(constants::DOS_SCORE_PROTOCOL_VIOLATION);
            return Err(DispatcherError::RateLimited("inv"));
        }

        let mut send = Vec::new();
        for item in items {
            if let crate::protocol::external::InventoryHash::Block(hash) = item {
                if peer.best_known_header != Some(hash) {
                    send.push(Message::GetHeaders(crate::protocol::external::message::GetHeaders {
                        block_header_hashes: peer.best_known_header.into_iter().collect(),
                        stop_hash: Some(hash),
                    }));
                }
            }
        }

        Ok(Effects { send, disconnect: false })
    }

    fn handle_getdata(
        &mut self,
        id: PeerId,
        items: Vec<crate::protocol::external::InventoryHash>,
    ) -> Result<Effects, DispatcherError> {
        if items.len() > constants::MAX_INV_SZ {
            let peer = self.peer_mut(id)?;
            peer.misbehaving(constants::DOS_SCORE_PROTOCOL_VIOLATION);
            return Err(DispatcherError::Oversize {
                kind: "getdata",
                len: items.len(),
                max: constants::MAX_INV_SZ,
            });
        }

        let mut seen = std::collections::HashSet::new();
        for item in &items {
            if !seen.insert(item.clone()) {
                let peer = self.peer_mut(id)?;
                peer.misbehaving(constants::DOS_SCORE_PROTOCOL_VIOLATION);
                return Err(DispatcherError::ProtocolViolation(
                    constants::DOS_SCORE_PROTOCOL_VIOLATION,
                ));
            }
        }

        // Serving the items themselves is handled by the inbound service,
        // which has access to the relay map / mempool / block store; this
        // layer only validates the request shape.
        Ok(Effects::none())
    }

    fn handle_getheaders(
        &mut self,
        id: PeerId,
        _request: crate::protocol::external::message::GetHeaders,
        now: Instant,
    ) -> Result<Effects, DispatcherError> {
        let peer = self.peer_mut(id)?;
        let total = peer.rate_limits.getheaders.record(1, now);
        if total > constants::MAX_GETHEADERS_PER_MINUTE {
            peer.misbehaving(constants::DOS_SCORE_PROTOCOL_VIOLATION);
            peer.introspection.recent_header_requests += 1;
            let disconnect = peer.introspection.add(10, now);
            return Ok(Effects {
                send: Vec::new(),
                disconnect,
            });
        }

        // The actual locator walk and header slice are produced by the
        // chain collaborator at the call site; this handler only enforces
        // the rate limit and introspection hardening.
        Ok(Effects::none())
    }

    fn handle_headers(
        &mut self,
        id: PeerId,
        headers: Vec<block::CountedHeader>,
        now: Instant,
    ) -> Result<Effects, DispatcherError> {
        if headers.len() > constants::MAX_HEADERS_RESULTS {
            let peer = self.peer_mut(id)?;
            peer.misbehaving(constants::DOS_SCORE_PROTOCOL_VIOLATION);
            return Err(DispatcherError::Oversize {
                kind: "headers",
                len: headers.len(),
                max: constants::MAX_HEADERS_RESULTS,
            });
        }

        for pair in headers.windows(2) {
            let prev_hash = block::Hash::from(&pair[0].header);
            if pair[1].header.previous_block_hash != prev_hash {
                let peer = self.peer_mut(id)?;
                peer.misbehaving(constants::DOS_SCORE_PROTOCOL_VIOLATION);
                return Err(DispatcherError::ProtocolViolation(
                    constants::DOS_SCORE_PROTOCOL_VIOLATION,
                ));
            }
        }

        let peer = self.peer_mut(id)?;
        let mut send = Vec::new();

        if let Some(first) = headers.first() {
            let parent_known = peer.best_known_header == Some(first.header.previous_block_hash);
            if !parent_known && headers.len() < constants::MAX_BLOCKS_TO_ANNOUNCE {
                send.push(Message::GetHeaders(crate::protocol::external::message::GetHeaders {
                    block_header_hashes: vec![first.header.previous_block_hash],
                    stop_hash: None,
                }));
                peer.unconnecting_headers += 1;
                if peer.unconnecting_headers % constants::MAX_UNCONNECTING_HEADERS == 0 {
                    peer.misbehaving(constants::DOS_SCORE_PROTOCOL_VIOLATION);
                }
            } else {
                peer.unconnecting_headers = 0;
            }
        }

        if let Some(last) = headers.last() {
            peer.best_known_header = Some(block::Hash::from(&last.header));
            peer.last_block_announcement = Some(now);
        }

        Ok(Effects { send, disconnect: false })
    }

    /// Records that a `ping` with `nonce` was just sent to `id`, so the
    /// matching `pong` can be told apart from an unsolicited one.
    pub fn send_ping(&mut self, id: PeerId, nonce: crate::protocol::external::types::Nonce) -> Result<Effects, DispatcherError> {
        let peer = self.peer_mut(id)?;
        peer.outstanding_ping_nonce = Some(nonce);
        Ok(Effects::send(Message::Ping(nonce)))
    }

    fn handle_pong(&mut self, id: PeerId, nonce: crate::protocol::external::types::Nonce) -> Result<Effects, DispatcherError> {
        let peer = self.peer_mut(id)?;

        match peer.outstanding_ping_nonce {
            None => {
                tracing::debug!(peer = id, "pong: unsolicited pong without ping");
            }
            Some(expected) if expected == nonce => {
                peer.outstanding_ping_nonce = None;
            }
            Some(expected) => {
                peer.pong_mismatch_count += 1;
                tracing::debug!(
                    peer = id,
                    expected = expected.0,
                    received = nonce.0,
                    "pong: nonce mismatch"
                );
                if peer.pong_mismatch_count > 3 {
                    tracing::debug!(peer = id, count = peer.pong_mismatch_count, "repeated pong mismatch");
                    peer.misbehaving(10);
                }
                if nonce.0 == 0 {
                    peer.outstanding_ping_nonce = None;
                }
            }
        }

        Ok(Effects::none())
    }

    fn handle_filterload(
        &mut self,
        id: PeerId,
        filter: crate::protocol::external::types::Filter,
        _hash_functions_count: u32,
        _tweak: crate::protocol::external::types::Tweak,
        _flags: u8,
        now: Instant,
    ) -> Result<Effects, DispatcherError> {
        if filter.0.len() > constants::MAX_FILTER_LENGTH {
            let peer = self.peer_mut(id)?;
            peer.misbehaving(100);
            return Err(DispatcherError::Oversize {
                kind: "filterload",
                len: filter.0.len(),
                max: constants::MAX_FILTER_LENGTH,
            });
        }

        let peer = self.peer_mut(id)?;
        let count = peer.rate_limits.filterload.record(1, now);
        if count > 1 {
            peer.misbehaving(50);
            return Err(DispatcherError::RateLimited("filterload"));
        }

        Ok(Effects::none())
    }

    fn handle_filteradd(&mut self, id: PeerId, data: Vec<u8>) -> Result<Effects, DispatcherError> {
        if data.len() > constants::MAX_SCRIPT_ELEMENT_SIZE {
            let peer = self.peer_mut(id)?;
            peer.misbehaving(100);
            return Err(DispatcherError::Oversize {
                kind: "filteradd",
                len: data.len(),
                max: constants::MAX_SCRIPT_ELEMENT_SIZE,
            });
        }
        Ok(Effects::none())
    }

    fn handle_mempool(&mut self, id: PeerId, now: Instant) -> Result<Effects, DispatcherError> {
        let peer = self.peer_mut(id)?;
        let count = peer.rate_limits.mempool.record(1, now);
        if count > 1 {
            peer.misbehaving(10);
            return Err(DispatcherError::RateLimited("mempool"));
        }
        if !peer.services.contains(PeerServices::NODE_BLOOM) && !peer.whitelisted {
            return Err(DispatcherError::ProtocolViolation(0));
        }
        Ok(Effects::none())
    }

    fn handle_sendcmpct(
        &mut self,
        id: PeerId,
        sendcmpct: crate::protocol::external::message::SendCompact,
    ) -> Result<Effects, DispatcherError> {
        let peer = self.peer_mut(id)?;
        peer.rate_limits.sendcmpct_count += 1;
        if peer.rate_limits.sendcmpct_count > constants::MAX_SENDCMPCT_PER_SESSION {
            peer.misbehaving(10);
            return Err(DispatcherError::RateLimited("sendcmpct"));
        }
        peer.negotiation.prefers_compact_announcements = sendcmpct.announce;
        if sendcmpct.version >= 2 {
            peer.negotiation.wants_compact_witness = true;
        }
        Ok(Effects::none())
    }

    fn handle_notfound(
        &mut self,
        id: PeerId,
        items: Vec<crate::protocol::external::InventoryHash>,
        now: Instant,
    ) -> Result<Effects, DispatcherError> {
        let peer = self.peer_mut(id)?;
        let total = peer.rate_limits.notfound.record(items.len(), now);
        if total > constants::MAX_NOTFOUND_PER_MINUTE {
            peer.misbehaving(10);
            return Err(DispatcherError::RateLimited("notfound"));
        }
        Ok(Effects::none())
    }

    fn handle_reject(&mut self, id: PeerId, now: Instant) -> Result<Effects, DispatcherError> {
        let peer = self.peer_mut(id)?;
        let total = peer.rate_limits.reject.record(1, now);
        if total > constants::MAX_REJECT_PER_MINUTE {
            // Over the logging budget: dropped silently, no misbehavior.
            return Ok(Effects::none());
        }
        Ok(Effects::none())
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Dispatcher::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peer::Direction;

    fn connected(dispatcher: &mut Dispatcher) -> PeerId {
        let id = dispatcher.peers.insert(Direction::Inbound);
        dispatcher.peers.get_mut(id).unwrap().sent_version = true;
        dispatcher.peers.get_mut(id).unwrap().received_verack = true;
        dispatcher.peers.get_mut(id).unwrap().handshake_complete = true;
        id
    }

    #[test]
    fn version_before_handshake_is_required() {
        let mut dispatcher = Dispatcher::new();
        let id = dispatcher.peers.insert(Direction::Inbound);
        let err = dispatcher
            .dispatch(id, Message::Verack, Instant::now())
            .unwrap_err();
        assert_eq!(err, DispatcherError::HandshakeNotStarted);
        assert!(dispatcher.peers.get(id).unwrap().misbehavior > 0);
    }

    #[test]
    fn addr_over_1000_entries_is_rejected() {
        let mut dispatcher = Dispatcher::new();
        let id = connected(&mut dispatcher);
        let addrs = vec![
            crate::meta_addr::MetaAddr::new(
                "127.0.0.1:8333".parse().unwrap(),
                PeerServices::NODE_NETWORK,
            );
            1001
        ];
        let err = dispatcher.dispatch(id, Message::Addr(addrs), Instant::now()).unwrap_err();
        assert!(matches!(err, DispatcherError::Oversize { kind: "addr", .. }));
        assert_eq!(dispatcher.peers.get(id).unwrap().misbehavior, 20);
    }

    #[test]
    fn getheaders_rate_limit_adds_introspection_and_can_disconnect() {
        let mut dispatcher = Dispatcher::new();
        let id = connected(&mut dispatcher);
        let now = Instant::now();

        for _ in 0..20 {
            dispatcher
                .dispatch(id, Message::GetHeaders(crate::protocol::external::message::GetHeaders {
                    block_header_hashes: vec![],
                    stop_hash: None,
                }), now)
                .unwrap();
        }

        let effects = dispatcher
            .dispatch(id, Message::GetHeaders(crate::protocol::external::message::GetHeaders {
                block_header_hashes: vec![],
                stop_hash: None,
            }), now)
            .unwrap();
        assert!(!effects.disconnect);
        assert_eq!(dispatcher.peers.get(id).unwrap().introspection.score, 10);
    }

    #[test]
    fn headers_must_chain() {
        use hive_chain::block::{self, Header};
        use hive_chain::work::difficulty::CompactDifficulty;
        use chrono::Utc;

        let mut dispatcher = Dispatcher::new();
        let id = connected(&mut dispatcher);

        let h1 = Header::new(
            1,
            block::Hash([0; 32]),
            hive_chain::block::merkle::Root([1; 32]),
            Utc::now(),
            CompactDifficulty(0x1d00ffff),
            0,
        );
        let h2 = Header::new(
            1,
            block::Hash([9; 32]), // wrong parent
            hive_chain::block::merkle::Root([2; 32]),
            Utc::now(),
            CompactDifficulty(0x1d00ffff),
            0,
        );

        let headers = vec![
            block::CountedHeader { header: h1, transaction_count: 0 },
            block::CountedHeader { header: h2, transaction_count: 0 },
        ];

        let err = dispatcher
            .dispatch(id, Message::Headers(headers), Instant::now())
            .unwrap_err();
        assert!(matches!(err, DispatcherError::ProtocolViolation(_)));
    }

    #[test]
    fn unsolicited_pong_does_not_change_misbehavior() {
        use crate::protocol::external::types::Nonce;

        let mut dispatcher = Dispatcher::new();
        let id = connected(&mut dispatcher);

        dispatcher.dispatch(id, Message::Pong(Nonce(42)), Instant::now()).unwrap();

        assert_eq!(dispatcher.peers.get(id).unwrap().misbehavior, 0);
        assert_eq!(dispatcher.peers.get(id).unwrap().pong_mismatch_count, 0);
    }

    #[test]
    fn matching_pong_clears_the_outstanding_ping() {
        use crate::protocol::external::types::Nonce;

        let mut dispatcher = Dispatcher::new();
        let id = connected(&mut dispatcher);

        dispatcher.send_ping(id, Nonce(7)).unwrap();
        dispatcher.dispatch(id, Message::Pong(Nonce(7)), Instant::now()).unwrap();

        assert_eq!(dispatcher.peers.get(id).unwrap().outstanding_ping_nonce, None);
        assert_eq!(dispatcher.peers.get(id).unwrap().misbehavior, 0);
    }

    #[test]
    fn repeated_pong_mismatch_triggers_misbehavior() {
        use crate::protocol::external::types::Nonce;

        let mut dispatcher = Dispatcher::new();
        let id = connected(&mut dispatcher);

        for _ in 0..4 {
            dispatcher.send_ping(id, Nonce(1)).unwrap();
            dispatcher.dispatch(id, Message::Pong(Nonce(2)), Instant::now()).unwrap();
        }

        assert_eq!(dispatcher.peers.get(id).unwrap().pong_mismatch_count, 4);
        assert_eq!(dispatcher.peers.get(id).unwrap().misbehavior, 10);
    }
}
