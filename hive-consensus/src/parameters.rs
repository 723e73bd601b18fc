//! Consensus-level parameters layered on top of `hive_chain::parameters`.

pub mod subsidy;
