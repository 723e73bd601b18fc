//! Formatting helpers.

use std::fmt;

/// Wraps a `Display` value so it renders via `Display` when used in a
/// `Debug` context (e.g. inside `f.debug_struct(..).field(..)`).
pub struct DisplayToDebug<T>(pub T);

impl<T: fmt::Display> fmt::Debug for DisplayToDebug<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
