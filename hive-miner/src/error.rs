//! Errors produced while assembling a block template.

use thiserror::Error;

/// An error describing why [`crate::assembler::BlockAssembler::create_new_block`]
/// could not produce a template.
#[derive(Error, Debug)]
pub enum AssemblerError {
    #[error("hive mining is not active at height {0:?}")]
    HiveNotActive(hive_chain::block::Height),

    #[error("no chain tip to build on")]
    NoTip,

    #[error(transparent)]
    Amount(#[from] hive_chain::amount::Error),

    #[error(transparent)]
    Subsidy(#[from] hive_consensus::SubsidyError),

    #[error(transparent)]
    CoinbaseData(#[from] hive_chain::transparent::CoinbaseDataError),

    #[error("assembled block template failed its own validity check: {0}")]
    InvalidTemplate(String),
}
