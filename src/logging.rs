use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install a fmt subscriber filtered by `RUST_LOG`, falling back to `filter`.
/// Safe to call more than once; later calls are ignored.
pub fn init(filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init();
}
