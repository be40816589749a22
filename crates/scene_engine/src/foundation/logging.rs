//! Logging utilities and structured logging support

pub use log::{debug, info, warn, error, trace};

/// Initialize the logging system
///
/// Honors `RUST_LOG` when set, otherwise logs at `info`.
pub fn init() {
    init_with_level("info");
}

/// Initialize the logging system with a default filter
///
/// `default_filter` uses `env_logger` syntax (`"debug"`, `"scene_engine=trace"`).
/// `RUST_LOG` still takes precedence. Calling this more than once is harmless.
pub fn init_with_level(default_filter: &str) {
    let env = env_logger::Env::default().default_filter_or(default_filter);
    if env_logger::Builder::from_env(env).try_init().is_err() {
        log::trace!("Logger already initialized");
    }
}
