//! Node configuration (spec §6 "Recognized configuration options"),
//! loaded from TOML the way the teacher's `zebrad` loads its `ZebradConfig`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use hive_chain::parameters::Network;
use hive_miner::assembler::{BlockMinFeeRate, DEFAULT_BLOCK_MAX_WEIGHT, MAX_BLOCK_WEIGHT};

use crate::error::NodeError;

/// `COMPACTBLOCKS_VERSION` reconstruction ring size (Bitcoin Core's
/// `DEFAULT_BLOCK_RECONSTRUCTION_EXTRA_TXN`).
const DEFAULT_BLOCK_RECONSTRUCTION_EXTRA_TXN: usize = 100;

/// Not present in the retained source slice (`miner.h` was filtered out of
/// `original_source/`); this follows the publicly documented LitecoinCash
/// Hive defaults rather than inventing an arbitrary value.
const DEFAULT_HIVE_CHECK_DELAY_MS: u64 = 1000;
const DEFAULT_HIVE_THREADS: i32 = -2;
const DEFAULT_HIVE_EARLY_OUT: bool = true;

const DEFAULT_MAX_ORPHAN_TRANSACTIONS: usize = 100;
const DEFAULT_BAN_SCORE_THRESHOLD: u32 = 100;
const DEFAULT_MAX_MEMPOOL_MB: u64 = 300;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub network: NetworkConfig,
    pub mining: MiningConfig,
    pub hive: HiveConfig,
    pub mempool: MempoolConfig,
    pub introspection: IntrospectionConfig,
    pub tracing: TracingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            network: NetworkConfig::default(),
            mining: MiningConfig::default(),
            hive: HiveConfig::default(),
            mempool: MempoolConfig::default(),
            introspection: IntrospectionConfig::default(),
            tracing: TracingConfig::default(),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, NodeError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let mut config: Config = toml::from_str(&contents)?;
        config.mining.clamp();
        config.hive.clamp();
        Ok(config)
    }

    /// `{config_dir()}/hived/hived.toml`, matching the teacher's default
    /// config-path convention.
    pub fn default_path() -> Option<PathBuf> {
        Some(dirs::config_dir()?.join("hived").join("hived.toml"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub network: Network,
    pub peer_count_target: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            network: Network::Mainnet,
            peer_count_target: 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MiningConfig {
    /// `blockmaxweight`: hard cap for assembler weight.
    pub block_max_weight: u64,
    /// `blockmintxfee`: assembler feerate floor, sat/kvB.
    pub block_min_tx_fee: i64,
    /// `blockreconstructionextratxn`: ring size for compact-block
    /// reconstruction aids. Not yet consulted by anything in this
    /// workspace (compact-block reconstruction is not implemented), kept
    /// so the option round-trips through config files that set it.
    pub block_reconstruction_extra_txn: usize,
    /// Address mined-block rewards are paid to. `None` disables mining.
    pub mining_address_script_hex: Option<String>,
}

impl Default for MiningConfig {
    fn default() -> Self {
        MiningConfig {
            block_max_weight: DEFAULT_BLOCK_MAX_WEIGHT,
            block_min_tx_fee: BlockMinFeeRate::default().0,
            block_reconstruction_extra_txn: DEFAULT_BLOCK_RECONSTRUCTION_EXTRA_TXN,
            mining_address_script_hex: None,
        }
    }
}

impl MiningConfig {
    fn clamp(&mut self) {
        self.block_max_weight = self.block_max_weight.clamp(4000, MAX_BLOCK_WEIGHT - 4000);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HiveConfig {
    /// `hivecheckdelay`: bee-keeper poll interval, in ms.
    pub check_delay_ms: u64,
    /// `hivecheckthreads`: number of bee workers. `-2` means cores−1;
    /// out-of-range values clamp to the core count.
    pub check_threads: i32,
    /// `hiveearlyout`: enable the early-abort watcher thread.
    pub early_out: bool,
    /// Not a recognized config option in the retained source slice; the
    /// Bee Search Coordinator's "a Hive block must follow a PoW block"
    /// check needs a limit, so this defaults to the conservative value
    /// (1) that check's own doc comment describes.
    pub max_consecutive_blocks: u32,
}

impl Default for HiveConfig {
    fn default() -> Self {
        HiveConfig {
            check_delay_ms: DEFAULT_HIVE_CHECK_DELAY_MS,
            check_threads: DEFAULT_HIVE_THREADS,
            early_out: DEFAULT_HIVE_EARLY_OUT,
            max_consecutive_blocks: 1,
        }
    }
}

impl HiveConfig {
    fn clamp(&mut self) {}

    /// Resolves `check_threads` to an actual worker count, per the
    /// `-2 means cores-1, out-of-range clamps to cores` rule.
    pub fn resolved_thread_count(&self) -> usize {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        if self.check_threads == -2 {
            cores.saturating_sub(1).max(1)
        } else if self.check_threads < 1 || self.check_threads as usize > cores {
            cores
        } else {
            self.check_threads as usize
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MempoolConfig {
    /// `maxorphantx`: orphan-pool cap, per peer.
    pub max_orphan_tx: usize,
    /// `maxmempool`: mempool byte cap, in MB, used for fee-filter derivation.
    pub max_mempool_mb: u64,
    /// `feefilter`: enable fee-filter egress.
    pub fee_filter: bool,
    pub whitelist_relay: bool,
    pub whitelist_force_relay: bool,
}

impl Default for MempoolConfig {
    fn default() -> Self {
        MempoolConfig {
            max_orphan_tx: DEFAULT_MAX_ORPHAN_TRANSACTIONS,
            max_mempool_mb: DEFAULT_MAX_MEMPOOL_MB,
            fee_filter: true,
            whitelist_relay: true,
            whitelist_force_relay: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntrospectionConfig {
    /// `banscore`: misbehavior ban threshold.
    pub ban_score_threshold: u32,
    /// `introspectionhardening`: enables the stale-fork / excessive-getheaders
    /// detectors of §4.1.
    pub hardening_enabled: bool,
    pub stale_fork_disconnect_count: u32,
    pub getheaders_per_minute: u32,
    pub disconnect_score: u32,
}

impl Default for IntrospectionConfig {
    fn default() -> Self {
        IntrospectionConfig {
            ban_score_threshold: DEFAULT_BAN_SCORE_THRESHOLD,
            hardening_enabled: true,
            stale_fork_disconnect_count: 3,
            getheaders_per_minute: 20,
            disconnect_score: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
    pub filter: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        TracingConfig { filter: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = Config::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(deserialized.mining.block_max_weight, config.mining.block_max_weight);
    }

    #[test]
    fn oversize_block_max_weight_is_clamped_on_load() {
        hive_test::init();
        let dir = tempdir::TempDir::new("hived-config-test").unwrap();
        let path = dir.path().join("hived.toml");
        std::fs::write(
            &path,
            "[mining]\nblock_max_weight = 999999999\nblock_min_tx_fee = 1000\nblock_reconstruction_extra_txn = 100\n",
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.mining.block_max_weight, MAX_BLOCK_WEIGHT - 4000);
    }

    #[test]
    fn negative_two_check_threads_means_cores_minus_one() {
        let mut hive = HiveConfig::default();
        hive.check_threads = -2;
        let cores = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        assert_eq!(hive.resolved_thread_count(), cores.saturating_sub(1).max(1));
    }

    #[test]
    fn out_of_range_check_threads_clamps_to_cores() {
        let mut hive = HiveConfig::default();
        hive.check_threads = 999_999;
        let cores = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        assert_eq!(hive.resolved_thread_count(), cores);
    }
}
