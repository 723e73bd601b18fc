//! Replays a log of misbehavior events through the real
//! [`hive_network::PeerState::misbehaving`] scoring function and reports
//! which peers would be banned.
//!
//! There is no on-disk, Bitcoin-Core-compatible ban-list format anywhere
//! in this workspace — `hive-network`'s ban bookkeeping
//! (`PeerState::misbehavior`/`should_ban`) is in-memory session state
//! only, consistent with `hive-state` carrying no persisted database
//! (spec §1 scope). This tool instead takes an operator-maintained JSON
//! log of `{peer, score}` misbehavior increments and replays them, so the
//! resulting ban decisions can be reviewed before they happen live.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use color_eyre::eyre::Result;
use serde::Deserialize;

use hive_network::peer::Direction;
use hive_network::{DosScore, PeerId, PeerState};

#[derive(Debug, Deserialize)]
struct MisbehaviorEvent {
    peer: PeerId,
    score: DosScore,
    reason: String,
}

#[derive(Debug, Deserialize)]
struct MisbehaviorLog {
    events: Vec<MisbehaviorEvent>,
}

pub fn inspect(path: &Path) -> Result<()> {
    let file = BufReader::new(File::open(path)?);
    let log: MisbehaviorLog = serde_json::from_reader(file)?;

    let mut peers: std::collections::BTreeMap<PeerId, PeerState> = std::collections::BTreeMap::new();

    for event in &log.events {
        let peer = peers
            .entry(event.peer)
            .or_insert_with(|| PeerState::new(event.peer, Direction::Inbound));
        let now_banned = peer.misbehaving(event.score);
        tracing::debug!(peer = event.peer, reason = %event.reason, score = event.score, "misbehavior event");
        if now_banned && peer.misbehavior == event.score {
            tracing::warn!(peer = event.peer, "peer crosses ban threshold");
        }
    }

    println!("{:>8}  {:>10}  {:>6}", "peer", "score", "ban?");
    for (id, peer) in &peers {
        println!("{:>8}  {:>10}  {:>6}", id, peer.misbehavior, peer.should_ban);
    }

    let banned = peers.values().filter(|p| p.should_ban).count();
    println!("\n{} of {} peers would be banned", banned, peers.len());

    Ok(())
}
