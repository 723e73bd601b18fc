//! Consensus validation error types.

use chrono::{DateTime, Utc};
use thiserror::Error;

use hive_chain::{
    block::{Hash, Height},
    parameters::Network,
    work::difficulty::ExpandedDifficulty,
};

/// An error describing why a block failed contextual or structural validation.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum BlockError {
    #[error("block has no transactions")]
    NoTransactions,

    #[error(transparent)]
    Transaction(#[from] TransactionError),

    #[error(transparent)]
    Subsidy(#[from] SubsidyError),

    #[error("block {1:?} at {0:?} has invalid difficulty threshold")]
    InvalidDifficulty(Height, Hash),

    #[error(
        "block {1:?} at {0:?} has a difficulty threshold {2:?} that is easier than \
         the {4:?} network's difficulty limit {3:?}"
    )]
    TargetDifficultyLimit(
        Height,
        Hash,
        ExpandedDifficulty,
        Network,
        ExpandedDifficulty,
    ),

    #[error("block {1:?} at {0:?} has a hash greater than its difficulty threshold {2:?} on {3:?}")]
    DifficultyFilter(Height, Hash, ExpandedDifficulty, Network),

    #[error("block has a bad merkle root: expected {expected:?}, actual {actual:?}")]
    BadMerkleRoot {
        actual: hive_chain::transaction::Hash,
        expected: hive_chain::transaction::Hash,
    },

    #[error("block contains duplicate transactions")]
    DuplicateTransaction,
}

/// An error describing why a transaction failed structural validation.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum TransactionError {
    #[error("transaction has no inputs")]
    NoInputs,

    #[error("transaction has no outputs")]
    NoOutputs,

    #[error("coinbase transaction must be the first transaction in its block")]
    CoinbasePosition,

    #[error("coinbase input found in non-coinbase transaction")]
    CoinbaseInputFound,

    #[error("transaction lock time has not been reached")]
    LockedUntilAfterBlockTime(DateTime<Utc>),

    #[error("transaction exceeds the standard transaction weight")]
    ExceedsStandardWeight,
}

/// An error describing why the coinbase transaction's subsidy is invalid.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum SubsidyError {
    #[error("coinbase transaction is missing or the block has no coinbase height")]
    NoCoinbase,

    #[error("coinbase transaction claims more value than subsidy plus fees allows")]
    InvalidAmount,
}
