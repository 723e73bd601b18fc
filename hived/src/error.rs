//! The top-level error type composing every crate boundary's own
//! `thiserror`-derived error enum (spec §4.8 "Error handling").

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NodeError {
    #[error("failed to read config file: {0}")]
    ConfigRead(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error(transparent)]
    Dispatcher(#[from] hive_network::DispatcherError),

    #[error(transparent)]
    Orphan(#[from] hive_mempool::OrphanError),

    #[error(transparent)]
    FeeEstimator(#[from] hive_feeestimator::FeeEstimatorError),

    #[error(transparent)]
    Assembler(#[from] hive_miner::AssemblerError),

    #[error("block failed structural validation: {0}")]
    BlockInvalid(#[from] hive_consensus::BlockError),

    #[error("no mining address configured")]
    NoMiningAddress,

    #[error("chain state commit failed: {0}")]
    StateCommit(String),
}
