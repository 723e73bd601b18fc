//! Common imports for test modules across the workspace.

pub use color_eyre::eyre::{eyre, Report, Result};
pub use pretty_assertions::assert_eq;
pub use proptest::prelude::*;
