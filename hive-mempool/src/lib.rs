//! The mempool-adjacent bookkeeping that the dispatcher and block assembler
//! share: ancestor/descendant package accounting (§3 `PackageEntry`), the
//! Orphan Pool (§4.3), and the short-lived transaction/out-of-band Relay
//! Maps (§4.7).
//!
//! Grounded on `examples/original_source/src/net_processing.cpp`'s
//! `AddOrphanTx` / `EraseOrphanTx` / `LimitOrphanTxSize` family of
//! functions (orphan pool) and its `vRelayExpiration` deque (relay maps).

pub mod orphan;
pub mod package;
pub mod relay;
pub mod tracking;

pub use orphan::{OrphanError, OrphanPool, PeerId};
pub use package::{Mempool, ModifiedEntries, ModifiedEntry, PackageEntry};
pub use relay::{RelayMap, TRANSACTION_RELAY_EXPIRY};
pub use tracking::MempoolTrackingRecord;
