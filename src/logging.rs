use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Filter for the given directives, falling back to `info` when none parse.
pub fn env_filter(directives: &str) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .parse_lossy(directives)
}

/// Install the fmt subscriber, filtered by `RUST_LOG` with an `info` default.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(
            &std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default(),
        ))
        .with_target(false)
        .try_init();
}
