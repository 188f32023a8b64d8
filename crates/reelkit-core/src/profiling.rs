//! Profiling utilities based on the `puffin` crate.
//!
//! Scopes are always compiled in and cost a single atomic load while
//! profiling is switched off. The HTTP viewer server needs the `profiling`
//! feature.

pub use puffin::{GlobalProfiler, profile_function, profile_scope};

/// Default address of the puffin HTTP server.
pub const DEFAULT_SERVER_ADDR: &str = "0.0.0.0:8585";

#[cfg(feature = "profiling")]
static PROFILING_SERVER: std::sync::OnceLock<puffin_http::Server> = std::sync::OnceLock::new();

/// Turn on puffin scopes and, with the `profiling` feature, start the HTTP
/// server that `puffin_viewer` connects to.
pub fn init_profiling() {
    puffin::set_scopes_on(true);

    #[cfg(feature = "profiling")]
    match puffin_http::Server::new(DEFAULT_SERVER_ADDR) {
        Ok(server) => {
            tracing::info!("Puffin profiler server started on http://{}", DEFAULT_SERVER_ADDR);
            let _ = PROFILING_SERVER.set(server);
        }
        Err(e) => {
            tracing::error!("Failed to start puffin server: {}", e);
        }
    }
}

/// Whether puffin scopes are currently being recorded.
#[inline]
pub fn is_enabled() -> bool {
    puffin::are_scopes_on()
}

/// Mark the start of a new frame for profiling.
///
/// The engine calls this once per render-loop tick.
#[inline]
pub fn new_frame() {
    puffin::GlobalProfiler::lock().new_frame();
}
