//! Protocol and peer-management constants.
//!
//! These mirror the tunables a Bitcoin-family full node's networking layer
//! uses to bound memory, rate-limit peers, and pace the initial block
//! download; they are not configurable at runtime.

use std::time::Duration;

use crate::protocol::external::types::ProtocolVersion;

/// The protocol version advertised in our own `version` message.
pub const CURRENT_VERSION: ProtocolVersion = ProtocolVersion(70016);

/// The minimum protocol version we will accept a peer at.
pub const MIN_PEER_VERSION: ProtocolVersion = ProtocolVersion(70001);

/// Protocol version after which a peer is sent an unsolicited `sendheaders`
/// during the handshake.
pub const SENDHEADERS_VERSION: ProtocolVersion = ProtocolVersion(70012);

/// Protocol version after which compact blocks (BIP 152) may use short IDs
/// over ordinary transaction relay.
pub const SHORT_IDS_BLOCKS_VERSION: ProtocolVersion = ProtocolVersion(70014);

/// Maximum number of entries carried in a single `inv`, `getdata`, or
/// `notfound` message.
pub const MAX_INV_SZ: usize = 50_000;

/// Maximum number of headers returned by a single `getheaders` response.
pub const MAX_HEADERS_RESULTS: usize = 2_000;

/// Maximum number of blocks announced via `inv`/`headers` in one batch.
pub const MAX_BLOCKS_TO_ANNOUNCE: usize = 8;

/// Maximum chain of unconnecting headers tolerated before the sender is
/// penalized for likely misbehavior.
pub const MAX_UNCONNECTING_HEADERS: usize = 10;

/// Maximum number of blocks a single peer may have in flight at once.
pub const MAX_BLOCKS_IN_TRANSIT_PER_PEER: usize = 16;

/// Width of the rolling block-selection window ahead of the common ancestor
/// with a syncing peer, used by the download scheduler.
pub const BLOCK_DOWNLOAD_WINDOW: u32 = 1024;

/// Maximum size of a single script element accepted in `filteradd`.
pub const MAX_SCRIPT_ELEMENT_SIZE: usize = 520;

/// Maximum size of a loaded Bloom filter.
pub const MAX_FILTER_LENGTH: usize = 36_000;

/// Time without progress on an in-flight block before it is considered
/// stalled and reassigned to another peer.
pub const BLOCK_STALLING_TIMEOUT: Duration = Duration::from_secs(2);

/// Base timeout for a block download, before per-peer scaling.
pub const BLOCK_DOWNLOAD_TIMEOUT_BASE: Duration = Duration::from_secs(15);

/// Additional per-in-flight-block timeout added to the base download
/// timeout.
pub const BLOCK_DOWNLOAD_TIMEOUT_PER_PEER: Duration = Duration::from_secs(1);

/// How long a chain-sync peer is given to provide further progress before
/// being disconnected for stalling the sync.
pub const CHAIN_SYNC_TIMEOUT: Duration = Duration::from_secs(20 * 60);

/// How long a peer has to respond to a `getheaders` request before being
/// considered unresponsive.
pub const HEADERS_RESPONSE_TIME: Duration = Duration::from_secs(15 * 60);

/// Interval between checks for whether an extra outbound peer should be
/// evicted in favor of a fresh connection attempt.
pub const STALE_CHECK_INTERVAL: Duration = Duration::from_secs(15);

/// Minimum time a connection must be up before it is eligible for the
/// stale-tip eviction the tip monitor performs.
pub const MINIMUM_CONNECT_TIME: Duration = Duration::from_secs(30);

/// Rate limit window for `addr` messages: at most this many accepted per
/// window, per peer.
pub const MAX_ADDR_PER_MINUTE: usize = 1_000;
pub const ADDR_RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

/// Rate limit window for `inv` messages.
pub const MAX_INV_PER_MINUTE: usize = 1_000;
pub const INV_RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

/// Rate limit window for `getheaders` messages.
pub const MAX_GETHEADERS_PER_MINUTE: usize = 20;
pub const GETHEADERS_RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

/// Minimum interval between accepted `filterload`/`filteradd` updates.
pub const FILTERLOAD_RATE_LIMIT_WINDOW: Duration = Duration::from_secs(600);

/// Minimum interval between honored `mempool` requests from the same peer.
pub const MEMPOOL_RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60 * 60);

/// Maximum number of `sendcmpct` messages honored per session.
pub const MAX_SENDCMPCT_PER_SESSION: usize = 5;

/// Rate limit window for `notfound` messages.
pub const MAX_NOTFOUND_PER_MINUTE: usize = 100;
pub const NOTFOUND_RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

/// Rate limit window for logging `reject` messages (they are never acted
/// on beyond logging).
pub const MAX_REJECT_PER_MINUTE: usize = 10;
pub const REJECT_RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

/// Misbehavior score added for a single protocol violation severe enough to
/// warrant discouragement tracking but not an immediate ban.
pub const DOS_SCORE_PROTOCOL_VIOLATION: u32 = 20;

/// Cumulative misbehavior score past which a peer is disconnected and its
/// address discouraged from future connection attempts.
pub const DOS_SCORE_BAN_THRESHOLD: u32 = 100;
