//! Contextual and structural validation for blocks and transactions:
//! subsidy schedule, difficulty adjustment (including the MinotaurX/Hive
//! alternate work regimes), and the `NetworkUpgrade` activation checks
//! that the core subsystems in `hive-network` and `hive-miner` consult.
//!
//! This crate does not implement script evaluation (see `hive-script`) or
//! UTXO-set tracking (see `hive-state`); it only answers "is this header /
//! transaction / block structurally and contextually valid".

pub mod block;
pub mod error;
pub mod parameters;
pub mod transaction;
pub mod work;

pub use error::{BlockError, SubsidyError, TransactionError};
