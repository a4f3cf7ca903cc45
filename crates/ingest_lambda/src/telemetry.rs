use tracing_subscriber::EnvFilter;

/// Installs the JSON subscriber used by every binary. Level defaults to
/// `info` and is overridden through `RUST_LOG`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
