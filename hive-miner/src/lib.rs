//! Block assembly and Hive bee-search mining (spec §4.5, §4.6): turning
//! mempool package-accounting state into a ready-to-submit block template,
//! and the Hive proof-of-work alternative search that produces a
//! bee-proof-script coinbase instead of hashing the header directly.
//!
//! Neither subsystem touches the on-disk UTXO database or wallet key
//! material directly; both are represented here by narrow collaborator
//! traits ([`ChainView`], [`bee_search::HiveWallet`]), per the
//! specification's "represent out-of-scope collaborators with a trait"
//! design note.

pub mod assembler;
pub mod bee_search;
mod chain_view;
mod error;

pub use assembler::{BlockAssembler, BlockMinFeeRate, BlockTemplate, Options};
pub use bee_search::{BeeRange, BeeSearchCoordinator, HiveWallet};
pub use chain_view::ChainView;
pub use error::AssemblerError;
