//! Logging setup for hosts embedding the middleware buffers
//!
//! The library itself only talks to the `log` facade. Binaries pick the
//! backend; these helpers wire up `env_logger` the way the demo apps do.

pub use log::{debug, error, info, trace, warn};

/// Initialize logging from `RUST_LOG`
pub fn init() {
    env_logger::init();
}

/// Initialize logging with `RUST_LOG` module filters plus a global level
///
/// Returns `false` if a logger was already installed (tests commonly race
/// on this), in which case the existing logger is kept.
pub fn init_with_level(level: log::LevelFilter) -> bool {
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .try_init()
        .is_ok()
}
