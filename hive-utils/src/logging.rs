//! Tracing/error-report setup shared by every subcommand, matching the
//! install sequence `hive_test::init` uses for tests.

pub fn init() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("HIVE_LOG").unwrap_or_else(|_| "hive_utils=info,warn".to_string()),
    );
    let fmt_layer = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(filter)
        .finish();

    let _ = tracing::subscriber::set_global_default(fmt_layer);
}
