//! Shared test harness: tracing/error-report setup, a small prelude, and
//! byte-exact wire fixtures for the other crates' unit and property tests.

use std::sync::Once;

pub mod prelude;
pub mod vectors;

static INIT: Once = Once::new();

/// Installs a `tracing` subscriber and a `color-eyre` panic/error report
/// hook, once per test binary. Cheap to call at the top of every test;
/// subsequent calls are no-ops.
pub fn init() {
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::new(
            std::env::var("HIVE_LOG").unwrap_or_else(|_| "hive=debug,warn".to_string()),
        );
        let fmt_layer = tracing_subscriber::fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_test_writer()
            .finish();

        let _ = tracing::subscriber::set_global_default(fmt_layer);
        let _ = color_eyre::install();
    });
}
