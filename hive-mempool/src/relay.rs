//! Short-lived relay maps (spec §3 Lifecycles, §4.7): entries created when
//! a transaction (or an out-of-band message) is accepted, expired off a
//! FIFO deque at a deterministic deadline rather than swept by scanning the
//! whole map.
//!
//! Grounded on `net_processing.cpp`'s `mapRelay` / `vRelayExpiration` pair:
//! a hash-keyed map for lookup and a `(expire-at, hash)` deque in insertion
//! order, since entries are always inserted with a monotonically
//! non-decreasing expiry and so the deque front is always the next one due.

use std::{
    collections::{HashMap, VecDeque},
    time::{Duration, Instant},
};

use hive_chain::transaction;

/// Default relay TTL for transactions (spec §4.7: "FIFO-expired (default
/// 15 minutes)").
pub const TRANSACTION_RELAY_EXPIRY: Duration = Duration::from_secs(15 * 60);

/// A FIFO-expiring relay map, generic over the payload (transactions, or
/// the fork-specific out-of-band message envelope).
pub struct RelayMap<T> {
    entries: HashMap<transaction::Hash, T>,
    expirations: VecDeque<(Instant, transaction::Hash)>,
    ttl: Duration,
}

impl<T> RelayMap<T> {
    pub fn new(ttl: Duration) -> Self {
        RelayMap {
            entries: HashMap::new(),
            expirations: VecDeque::new(),
            ttl,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, hash: &transaction::Hash) -> Option<&T> {
        self.entries.get(hash)
    }

    pub fn contains(&self, hash: &transaction::Hash) -> bool {
        self.entries.contains_key(hash)
    }

    /// Inserts `payload` under `hash`, due to expire `self.ttl` after `now`.
    pub fn insert(&mut self, hash: transaction::Hash, payload: T, now: Instant) {
        self.entries.insert(hash, payload);
        self.expirations.push_back((now + self.ttl, hash));
    }

    /// Pops every entry whose expiry has passed, removing it from the
    /// lookup map. The deque stays in expiry order because every insertion
    /// uses the same TTL relative to a monotonic clock.
    pub fn expire(&mut self, now: Instant) -> usize {
        let mut expired = 0;
        while let Some((expire_at, hash)) = self.expirations.front() {
            if *expire_at > now {
                break;
            }
            let hash = *hash;
            self.expirations.pop_front();
            self.entries.remove(&hash);
            expired += 1;
        }
        expired
    }
}

impl<T> Default for RelayMap<T> {
    fn default() -> Self {
        RelayMap::new(TRANSACTION_RELAY_EXPIRY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expires_entries_past_ttl() {
        hive_test::init();
        let mut map: RelayMap<()> = RelayMap::new(Duration::from_secs(1));
        let hash = transaction::Hash([1; 32]);
        let t0 = Instant::now();
        map.insert(hash, (), t0);
        assert!(map.contains(&hash));

        assert_eq!(map.expire(t0), 0);
        assert_eq!(map.expire(t0 + Duration::from_secs(2)), 1);
        assert!(!map.contains(&hash));
    }

    #[test]
    fn fifo_order_holds_with_uniform_ttl() {
        hive_test::init();
        let mut map: RelayMap<u8> = RelayMap::new(Duration::from_secs(10));
        let t0 = Instant::now();
        for i in 0..5u8 {
            map.insert(transaction::Hash([i; 32]), i, t0 + Duration::from_secs(i as u64));
        }
        assert_eq!(map.len(), 5);
        let expired = map.expire(t0 + Duration::from_secs(12));
        assert_eq!(expired, 3);
    }
}
