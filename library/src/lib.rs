//! # `xerosync`: Push Lightning Payments to Xero
//!
//! This library turns incoming payments of a Lightning wallet platform into
//! Xero `RECEIVE` bank transactions, and remembers which payments it already
//! pushed so that no payment is ever recorded twice.
//!
//! A push reserves the payment hash in storage before calling Xero. The
//! reservation is confirmed with Xero's transaction id on success and removed
//! again if the call fails, so a later attempt can retry. Concurrent pushes of
//! one payment race on the reservation, and only the winner calls Xero.
//!
//! Payments reach the library in two ways: one at a time, as the platform
//! reports them ([`XeroSync::on_payment`], or the listener started with
//! [`XeroSync::listen`]), or as a batch replay of a wallet's history
//! ([`XeroSync::reconcile_wallet`]).
//!
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use xerosync::{storage::stores::Sqlite, XeroSync};
//!
//! let store = Sqlite::new("xerosync.db")?;
//! let xero_sync = XeroSync::builder(store).build()?;
//!
//! let summary = xero_sync.reconcile_wallet("wallet config id").await?;
//! println!("{summary}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! ### `in-memory`
//!
//! The `in-memory` feature enables the [`InMemory`](storage::stores::InMemory)
//! storage implementation.
//!
//! ### `sqlite`
//!
//! The `sqlite` feature enables the [`Sqlite`](storage::stores::Sqlite)
//! storage implementation.

#![warn(clippy::pedantic)]
#![warn(missing_docs)]
#![warn(clippy::cargo)]
#![warn(clippy::panic)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::module_name_repetitions)]

mod authorization;
mod connection;
mod listener;
mod payment;
mod pipeline;
mod reconcile;
mod settings;
pub mod storage;
mod synced_payment;
mod tax_mapping;
mod token;
pub mod transaction;
mod wallet;
pub mod xero_client;
mod xero_sync;

pub use authorization::{
    authorize_url, AUTHORIZATION_TTL_SECS, DEFAULT_AUTHORIZE_URL, DEFAULT_SCOPES,
};
pub use connection::{AccessToken, TokenSet, XeroConnection};
pub use listener::ListenerHandle;
pub use payment::{Payment, PaymentStatus, FIAT_AMOUNT_KEY, FIAT_CURRENCY_KEY};
pub use pipeline::PushOutcome;
use rand::{distributions::Alphanumeric, Rng};
pub use reconcile::ReconcileSummary;
pub use settings::{ClientCredentials, ExtensionSettings};
use storage::StorageError;
pub use synced_payment::{Confirmation, Reservation, SyncedPayment};
pub use tax_mapping::{classify_tax_rates, TaxMapping};
use thiserror::Error;
pub use token::{needs_refresh, REFRESH_MARGIN_SECS};
pub use transaction::{build_transaction, BuiltTransaction, SkipReason};
pub use wallet::{
    TaxRateCategory, WalletConfig, DEFAULT_ACCOUNT_CODE, PLATFORM_NAME, ZERO_ACCOUNT_ID,
};
use xero_client::XeroError;
pub use xero_sync::{XeroSync, XeroSyncBuilder};

/// Library's custom error type.
#[derive(Error, Debug)]
pub enum XeroSyncError {
    /// An error originating from a Xero API call.
    #[error("Xero API error: {0}")]
    Xero(#[from] XeroError),
    /// An error storing or retrieving records.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    /// The operation cannot run with the user's current configuration.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    /// No wallet configuration with this id exists.
    #[error("wallet configuration {0} not found")]
    WalletNotFound(String),
    /// The payment listener task panicked or was cancelled.
    #[error("payment listener task failed: {0}")]
    Listener(#[from] tokio::task::JoinError),
}

/// Missing configuration preventing an operation. Not retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The user has not entered their Xero app credentials.
    #[error("Xero client id and secret are not set for user {0}")]
    MissingCredentials(String),
    /// The user has not connected a Xero organisation.
    #[error("user {0} has no Xero connection")]
    MissingConnection(String),
    /// The token grants access to no organisation.
    #[error("no Xero organisation is authorized for this token")]
    NoTenant,
}

/// Random identifier for new records.
pub(crate) fn new_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(22)
        .map(char::from)
        .collect()
}
