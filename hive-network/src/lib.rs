//! Peer-to-peer networking: wire protocol, peer state, and the message
//! dispatcher, download scheduler, and tip monitor that drive a peer's
//! lifecycle from handshake to block relay.

pub mod constants;
pub mod meta_addr;
pub mod peer;
pub mod protocol;
pub mod relay;
pub mod scheduler;
pub mod tip_monitor;

pub use peer::dispatch::{Dispatcher, DispatcherError};
pub use peer::{DosScore, PeerId, PeerState};
pub use protocol::external::{Command, Message};
pub use scheduler::DownloadScheduler;
pub use tip_monitor::TipMonitor;
