//! Logging initialization

/// Initialize the logging system
///
/// Uses env_logger with default filter level of `info`.
/// Override with RUST_LOG environment variable, e.g. `RUST_LOG=gpugrass=debug`
/// to see buffer sizing at activation.
///
/// # Example
/// ```no_run
/// gpugrass::core::logging::init();
/// log::info!("Grass viewer started");
/// ```
pub fn init() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")
    ).init();
}
