use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default SQLite database file.
const DEFAULT_DB_PATH: &str = "xerosync.db";

#[derive(Clone, Deserialize, PartialEq, Eq, Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct DatabaseConfig {
    /// SQLite database file. Created if it does not exist.
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DB_PATH),
        }
    }
}
