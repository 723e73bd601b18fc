//! The Tip Monitor (spec §4.2, closing paragraph): detects a stalled tip and
//! picks an outbound peer to evict in favor of a fresh connection attempt.

use std::time::{Duration, Instant};

use crate::constants;
use crate::peer::{PeerId, PeerTable};

pub struct TipMonitor {
    last_check: Option<Instant>,
}

impl TipMonitor {
    pub fn new() -> Self {
        TipMonitor { last_check: None }
    }

    /// `true` once [`constants::STALE_CHECK_INTERVAL`] has elapsed since the
    /// last check; updates the internal clock as a side effect.
    pub fn due(&mut self, now: Instant) -> bool {
        let due = match self.last_check {
            Some(last) => now.duration_since(last) >= constants::STALE_CHECK_INTERVAL,
            None => true,
        };
        if due {
            self.last_check = Some(now);
        }
        due
    }

    /// `true` if the tip hasn't advanced for `3 * target_spacing` and
    /// nothing is currently in flight anywhere, meaning an extra outbound
    /// slot should be requested.
    pub fn should_request_extra_outbound(
        &self,
        tip_stalled_for: Duration,
        target_spacing: Duration,
        anything_in_flight: bool,
    ) -> bool {
        !anything_in_flight && tip_stalled_for >= target_spacing * 3
    }

    /// Picks the outbound peer with the oldest last-block-announcement,
    /// excluding protected peers and peers with less than
    /// [`constants::MINIMUM_CONNECT_TIME`] uptime or a non-zero in-flight
    /// count.
    pub fn extra_outbound_eviction_candidate(
        peers: &PeerTable,
        now: Instant,
        connected_since: impl Fn(PeerId) -> Instant,
    ) -> Option<PeerId> {
        peers
            .iter()
            .filter(|(_, peer)| peer.is_outbound())
            .filter(|(_, peer)| !peer.is_protected_from_eviction())
            .filter(|(_, peer)| peer.in_flight.is_empty())
            .filter(|(id, _)| now.duration_since(connected_since(**id)) >= constants::MINIMUM_CONNECT_TIME)
            .min_by_key(|(_, peer)| peer.last_block_announcement.unwrap_or(now))
            .map(|(id, _)| *id)
    }
}

impl Default for TipMonitor {
    fn default() -> Self {
        TipMonitor::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peer::Direction;

    #[test]
    fn due_fires_once_per_interval() {
        let mut monitor = TipMonitor::new();
        let t0 = Instant::now();
        assert!(monitor.due(t0));
        assert!(!monitor.due(t0 + Duration::from_secs(1)));
        assert!(monitor.due(t0 + constants::STALE_CHECK_INTERVAL + Duration::from_secs(1)));
    }

    #[test]
    fn eviction_skips_protected_and_in_flight_peers() {
        let mut peers = PeerTable::new();
        let protected_id = peers.insert(Direction::Manual);
        let busy_id = peers.insert(Direction::Outbound);
        let evictable_id = peers.insert(Direction::Outbound);

        let now = Instant::now();
        peers.get_mut(busy_id).unwrap().in_flight.push(crate::peer::QueuedBlock {
            hash: hive_chain::block::Hash([1; 32]),
            height: None,
            validated_headers: false,
            requested_at: now,
        });
        peers.get_mut(evictable_id).unwrap().last_block_announcement = Some(now - Duration::from_secs(10));

        let connected_since = |_id: PeerId| now - Duration::from_secs(1000);
        let candidate = TipMonitor::extra_outbound_eviction_candidate(&peers, now, connected_since);
        assert_eq!(candidate, Some(evictable_id));
        assert_ne!(candidate, Some(protected_id));
        assert_ne!(candidate, Some(busy_id));
    }
}
