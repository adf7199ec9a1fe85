use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the tracing subscriber with env-based filtering.
///
/// `RUST_LOG` wins over `LOG_LEVEL`; both accept plain level names in any
/// case (`DEBUG`, `warn`, ...) as well as full directives.
/// Falls back to `default_level` if neither is set or parseable.
pub fn init_tracing(default_level: &str) {
    let filter = build_filter(default_level);

    // A second init (tests, embedded use) keeps the first subscriber.
    let _ = fmt().with_env_filter(filter).with_target(true).try_init();
}

fn build_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_env("RUST_LOG")
        .or_else(|_| EnvFilter::try_from_env("LOG_LEVEL"))
        .unwrap_or_else(|_| EnvFilter::new(default_level))
}
