//! Logging bootstrap based on `tracing-subscriber`.

use tracing_subscriber::EnvFilter;

/// Directives applied when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "info,wgpu_core=warn,wgpu_hal=warn,naga=warn";

/// Install a formatted subscriber honouring `RUST_LOG`, falling back to
/// [`DEFAULT_FILTER`].
///
/// Calling this more than once is harmless; later calls are ignored.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Install a formatted subscriber with an explicit filter string.
pub fn init_with_filter(directives: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(directives))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_with_filter("debug");
        init();
        tracing::debug!("logging initialised twice without panicking");
    }
}
