use log::LevelFilter;
use serde::{Deserialize, Serialize};

/// Verbosity of the server and the `xerosync` library. Dependencies only log
/// warnings and errors.
#[derive(Deserialize, PartialEq, Eq, Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct LoggingConfig {
    /// One of `off`, `error`, `warn`, `info`, `debug` or `trace`.
    #[serde(default = "default_verbosity")]
    pub verbosity: LevelFilter,
}

fn default_verbosity() -> LevelFilter {
    LevelFilter::Info
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            verbosity: default_verbosity(),
        }
    }
}
