use tracing_subscriber::EnvFilter;

/// Diagnostics go to stderr so command output on stdout stays parseable.
/// `RUST_LOG` takes precedence over the `--log-level` value.
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
