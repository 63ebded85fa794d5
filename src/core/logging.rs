//! Logging initialization and utilities

/// Initialize the logging system
///
/// Uses env_logger with a default filter level of `warn`, keeping stderr
/// quiet while the viewer runs. Override with the RUST_LOG environment
/// variable (`RUST_LOG=debug` traces every decode and eviction).
///
/// # Example
/// ```
/// panogrid::core::logging::init();
/// log::warn!("running without a worker pool");
/// ```
pub fn init() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("warn")
    ).init();
}
