//! Block subsidy calculation, including the MinotaurX/Hive adjustments.

pub mod general;

pub use general::{block_subsidy, find_output_with_amount};
