#![allow(missing_docs)]
#![allow(clippy::missing_panics_doc)]

mod fixtures;
mod xero;

use std::fs;

pub use fixtures::{
    connection, expired_connection, payment, pushing_wallet, settings, BANK_ACCOUNT_ID, USER_ID,
    WALLET_CONFIG_ID, WALLET_ID,
};
use tempfile::Builder;
use tracing_subscriber::{filter::LevelFilter, prelude::*, EnvFilter};
pub use xero::{MockXero, TENANT_ID};

/// Path of a fresh, empty directory that outlives the test.
#[must_use]
pub fn new_temp_dir() -> String {
    let path = Builder::new()
        .prefix("temp_db_")
        .rand_bytes(16)
        .tempdir()
        .expect("failed to generate temporary directory")
        .path()
        .to_str()
        .expect("failed to get temporary directory path")
        .to_string();
    fs::create_dir_all(&path).expect("failed to create temporary directory");
    path
}

/// Initialize the logging implementation.
pub fn init_logger() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::DEBUG.into())
        .from_env_lossy();
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_test_writer()
        .with_filter(filter);
    let _ = tracing_subscriber::registry().with(fmt_layer).try_init();
}
