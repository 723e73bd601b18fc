//! Small operator CLI: offline inspection tools that don't require a
//! running node (spec §2). Each subcommand reads a file a live `hived`
//! would otherwise produce or consume and prints a human-readable report.

mod fee_estimates;
mod logging;
mod peer_bans;

use std::path::PathBuf;

use color_eyre::eyre::Result;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "hive-utils", about = "Operator inspection tools for hived")]
enum Command {
    /// Dump smart-fee estimates from a fee-estimate file.
    FeeEstimates {
        /// Path to the fee-estimate file (e.g. `fee_estimates.dat`).
        path: PathBuf,
    },
    /// Replay a misbehavior-event log and report which peers would be banned.
    PeerBans {
        /// Path to a JSON misbehavior log.
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;
    logging::init();

    match Command::from_args() {
        Command::FeeEstimates { path } => fee_estimates::dump(&path),
        Command::PeerBans { path } => peer_bans::inspect(&path),
    }
}
