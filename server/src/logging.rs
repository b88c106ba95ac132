//! Logging utilities for `xerosync-server`.

use log::LevelFilter;

use crate::config::LoggingConfig;

/// Initialize the logging implementation. Defaults to `Trace` verbosity for
/// `xerosync` and `Warn` for dependencies.
pub fn init_logger() {
    env_logger::builder()
        .filter_level(LevelFilter::Warn)
        .filter_module("xerosync", LevelFilter::Trace)
        .filter_module("xerosync_server", LevelFilter::Trace)
        .init();
}

/// Set verbosity of the service. Messages above the level are discarded.
pub fn set_verbosity(config: LoggingConfig) {
    log::set_max_level(config.verbosity);
}
