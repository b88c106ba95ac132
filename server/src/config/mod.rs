mod database;
mod logging;
mod server;
mod sync;
mod xero;

use std::{
    env::{self, VarError},
    ffi::OsString,
    fs, io,
    io::ErrorKind as IoErrorKind,
    path::PathBuf,
};

use clap::{Arg, ArgAction, Command};
pub(crate) use database::DatabaseConfig;
use dotenv::dotenv;
use log::info;
pub(crate) use logging::LoggingConfig;
use secrecy::Secret;
use serde::{Deserialize, Serialize};
use serde_yaml::Error as YamlError;
pub(crate) use server::ServerConfig;
pub(crate) use sync::SyncConfig;
use thiserror::Error;
pub(crate) use xero::XeroConfig;

/// `xerosync-server` configuration.
#[derive(Deserialize, PartialEq, Debug, Serialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Config for the HTTP API.
    pub server: ServerConfig,
    /// Xero endpoints, OAuth settings and timeouts.
    pub xero: XeroConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Payment push behaviour.
    pub sync: SyncConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

impl Config {
    /// Config file used when neither `--config-file` nor `CONFIG_FILE` is
    /// given.
    pub const DEFAULT_PATH: &'static str = "xerosync.yaml";

    /// Config file path of this process: `-f`/`--config-file`, then
    /// `CONFIG_FILE`, then [`Config::DEFAULT_PATH`].
    #[must_use]
    pub fn get_path() -> PathBuf {
        Self::path_from_args(env::args_os())
    }

    fn path_from_args<I, T>(args: I) -> PathBuf
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Command::new("xerosync-server")
            .arg(
                Arg::new("config-file")
                    .short('f')
                    .long("config-file")
                    .action(ArgAction::Set)
                    .value_name("FILE")
                    .env("CONFIG_FILE")
                    .default_value(Self::DEFAULT_PATH)
                    .help("YAML config file, created from defaults if missing"),
            )
            .get_matches_from(args)
            .get_one::<String>("config-file")
            .map_or_else(|| PathBuf::from(Self::DEFAULT_PATH), PathBuf::from)
    }

    /// Parse the config file at `path`. A missing file is written out with the
    /// defaults, which are then used.
    fn from_file(path: &PathBuf) -> Result<Config, ConfigError> {
        match fs::read_to_string(path) {
            Ok(yaml) => Ok(serde_yaml::from_str(&yaml)?),
            Err(e) if e.kind() == IoErrorKind::NotFound => {
                info!("No config at {}, writing defaults there", path.display());
                let config = Config::default();
                fs::write(path, serde_yaml::to_string(&config)?)?;
                Ok(config)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Secrets are taken from the environment, or from a `.env` file when the
    /// environment lacks them.
    fn apply_env_overrides(mut self) -> Result<Config, ConfigError> {
        dotenv().ok();

        match env::var("API_TOKEN") {
            Ok(token) => self.server.token = Some(Secret::new(token)),
            Err(VarError::NotPresent) => {}
            Err(e) => return Err(e.into()),
        }

        Ok(self)
    }

    /// Check the config for values the service cannot run with.
    ///
    /// # Panics
    ///
    /// Panics with a description of the first problem found.
    pub fn validate(&self) {
        self.server.validate();
        self.xero.validate();
        self.sync.validate(self.xero.timeout);
    }

    /// Load the config file and apply environment overrides.
    pub(crate) fn read(path: &PathBuf) -> Result<Config, ConfigError> {
        Self::from_file(path)?.apply_env_overrides()
    }
}

#[derive(Error, Debug)]
pub(crate) enum ConfigError {
    #[error("environment variable is not valid unicode: {0}")]
    Env(#[from] VarError),
    #[error("config file IO failed: {0}")]
    Io(#[from] io::Error),
    #[error("config file is not valid YAML: {0}")]
    Yaml(#[from] YamlError),
}
