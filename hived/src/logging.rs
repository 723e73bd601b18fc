//! Tracing subscriber setup (spec §4.8 "Logging"), matching the install
//! sequence `hive_test::init` uses for tests.

use tracing_error::ErrorLayer;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::TracingConfig;

pub fn init(config: &TracingConfig) {
    let directives = config
        .filter
        .clone()
        .or_else(|| std::env::var("HIVE_LOG").ok())
        .unwrap_or_else(|| "hived=info,hive_network=info,hive_miner=info,warn".to_string());

    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::new(directives))
        .with(fmt::layer())
        .with(ErrorLayer::default());

    let _ = tracing::subscriber::set_global_default(subscriber);
}
