//! `hived`: the orchestration binary tying the chain state, mempool,
//! fee estimator, and Hive bee-search miner together. No transport layer
//! exists anywhere in this workspace (see `DESIGN.md`'s "Pending" note),
//! so the net/ingress thread the teacher's `zebrad` would run here has no
//! real socket to drive; the validation-callback thread is wired to an
//! in-process channel that a future ingress can feed blocks into.

mod chain_view;
mod config;
mod error;
mod logging;
mod validation;
mod wallet;

use std::path::PathBuf;
use std::sync::{mpsc, Arc, Mutex, RwLock};
use std::time::Duration;

use gumdrop::Options;
use tracing::{error, info, warn};

use hive_chain::block::Block;
use hive_feeestimator::FeeEstimator;
use hive_mempool::package::Mempool;
use hive_miner::bee_search::{classic_bee_hash, BeeSearchCoordinator, SearchOptions};
use hive_state::State;

use crate::chain_view::ChainViewAdapter;
use crate::config::Config;
use crate::wallet::NullHiveWallet;

#[derive(Debug, Options)]
struct Args {
    #[options(help = "print help message")]
    help: bool,

    #[options(help = "path to the TOML config file")]
    config: Option<PathBuf>,
}

fn load_config(args: &Args) -> color_eyre::eyre::Result<Config> {
    if let Some(path) = &args.config {
        return Ok(Config::from_file(path)?);
    }

    match Config::default_path() {
        Some(path) if path.exists() => Ok(Config::from_file(&path)?),
        _ => Ok(Config::default()),
    }
}

fn fee_estimates_path() -> PathBuf {
    match Config::default_path() {
        Some(path) => path.with_file_name("fee_estimates.dat"),
        None => PathBuf::from("fee_estimates.dat"),
    }
}

fn load_fee_estimator(path: &PathBuf) -> FeeEstimator {
    let file = match std::fs::File::open(path) {
        Ok(file) => file,
        Err(_) => return FeeEstimator::new(),
    };

    match FeeEstimator::read(file) {
        Ok(Some(estimator)) => estimator,
        Ok(None) => {
            warn!("fee estimates file predates the supported format, starting fresh");
            FeeEstimator::new()
        }
        Err(err) => {
            warn!(%err, "failed to read fee estimates file, starting fresh");
            FeeEstimator::new()
        }
    }
}

fn persist_fee_estimator(estimator: &FeeEstimator, path: &PathBuf) {
    match std::fs::File::create(path) {
        Ok(file) => {
            if let Err(err) = estimator.write(file) {
                error!(%err, "failed to persist fee estimates");
            }
        }
        Err(err) => error!(%err, "failed to open fee estimates file for writing"),
    }
}

/// Periodically snapshots the fee estimator to disk, matching the
/// teacher's write-on-interval-and-on-shutdown persistence policy.
fn spawn_fee_estimator_persistence_thread(fee_estimator: Arc<Mutex<FeeEstimator>>, path: PathBuf) {
    std::thread::spawn(move || loop {
        std::thread::sleep(Duration::from_secs(15 * 60));
        let estimator = fee_estimator.lock().expect("fee estimator lock not poisoned");
        persist_fee_estimator(&estimator, &path);
    });
}

/// Drives the Bee Search Coordinator on `hive.check_delay_ms` intervals.
/// With no network transport wired in, `peer_count` is always `0`, so the
/// search's own "not connected to any peers" precondition always declines
/// to search; this is an honest placeholder for a future peer-count feed.
fn spawn_hive_search_thread(
    state: Arc<RwLock<State>>,
    network: hive_chain::parameters::Network,
    hive_config: config::HiveConfig,
) {
    std::thread::spawn(move || {
        let coordinator = BeeSearchCoordinator::new(SearchOptions {
            thread_count: hive_config.resolved_thread_count(),
            early_abort_watcher: hive_config.early_out,
            poll_interval: Duration::from_millis(hive_config.check_delay_ms.max(1)),
        });
        let wallet = NullHiveWallet;

        loop {
            std::thread::sleep(Duration::from_millis(hive_config.check_delay_ms.max(1)));

            let chain = ChainViewAdapter::new(&state);
            let peer_count = 0;

            if let Some(proof) = coordinator.search(
                &chain,
                &wallet,
                network,
                peer_count,
                false,
                hive_config.max_consecutive_blocks,
                classic_bee_hash,
            ) {
                info!(script_len = proof.script.0.len(), "found a Hive proof");
            }
        }
    });
}

/// Runs every context-free structural check, then commits to the chain
/// state, on whatever blocks arrive over `block_rx`.
fn spawn_validation_thread(
    state: Arc<RwLock<State>>,
    network: hive_chain::parameters::Network,
    block_rx: mpsc::Receiver<Arc<Block>>,
) {
    std::thread::spawn(move || {
        for block in block_rx {
            let now = chrono::Utc::now();
            match validation::validate_block(&block, network, now) {
                Ok(()) => {
                    let mut state = state.write().expect("chain state lock not poisoned");
                    if let Err(err) = state.commit_block(Arc::clone(&block)) {
                        error!(%err, "failed to commit validated block");
                    }
                }
                Err(err) => warn!(%err, "rejected invalid block"),
            }
        }
    });
}

#[tokio::main]
async fn main() -> color_eyre::eyre::Result<()> {
    color_eyre::install()?;

    let args = Args::parse_args_default_or_exit();
    let config = load_config(&args)?;

    logging::init(&config.tracing);
    info!("hived starting up");

    let state = Arc::new(RwLock::new(State::new(config.network.network)));
    let _mempool = Arc::new(Mutex::new(Mempool::new()));

    let fee_estimates_path = fee_estimates_path();
    let fee_estimator = Arc::new(Mutex::new(load_fee_estimator(&fee_estimates_path)));

    spawn_fee_estimator_persistence_thread(Arc::clone(&fee_estimator), fee_estimates_path.clone());
    spawn_hive_search_thread(Arc::clone(&state), config.network.network, config.hive.clone());

    let (block_tx, block_rx) = mpsc::channel::<Arc<Block>>();
    spawn_validation_thread(Arc::clone(&state), config.network.network, block_rx);
    // Kept alive for a future ingress (net thread) to clone and feed.
    let _block_tx = block_tx;

    tokio::signal::ctrl_c().await?;
    info!("received shutdown signal, persisting fee estimates");
    persist_fee_estimator(
        &fee_estimator.lock().expect("fee estimator lock not poisoned"),
        &fee_estimates_path,
    );

    Ok(())
}
