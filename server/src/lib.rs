//! # `xerosync_server`: Push Lightning payments to Xero over HTTP.
//! `xerosync_server` wraps the `xerosync` library in a small HTTP service. The
//! wallet platform reports paid invoices and triggers batch pushes through a
//! bearer-protected API, and users connect their Xero organisation through
//! the OAuth routes.
//!
//! This library is intended for use by the `xerosync-server` binary, and is not
//! intended to be used on its own.

mod config;
pub mod logging;
mod server;

use std::{io::Error as IoError, net::SocketAddr, path::PathBuf};

use log::{debug, error, info, warn};
use server::{new_server, Server, State};
use tokio::{signal, sync::mpsc};
use xerosync::{
    storage::{stores::Sqlite, Storage},
    ListenerHandle, Payment, XeroSync,
};

pub use crate::{config::Config, server::api};
use crate::logging::{init_logger, set_verbosity};

/// Start the standalone sync service.
pub async fn entrypoint() {
    init_logger();

    let config_path = Config::get_path();
    let config = load_config(&config_path);
    set_verbosity(config.logging);

    let xero_sync = build_xero_sync(&config);
    info!("Xero sync created.");
    match xero_sync.sweep_stale_reservations().await {
        Ok(0) => {}
        Ok(n) => warn!("Removed {n} orphaned reservations left by a previous run"),
        Err(e) => error!("Failed to sweep orphaned reservations: {e}"),
    }

    let (payments, receiver) = mpsc::channel(config.sync.event_queue_size);
    let listener = xero_sync.listen(receiver);
    info!("Payment listener running.");

    let server = build_server(&config, xero_sync.clone(), payments).await;
    debug!("Built xerosync-server");
    run_server(server, listener, xero_sync).await;
}

/// Loads config.
///
/// # Panics
///
/// Panics if the config could not be read or validated.
#[must_use]
pub fn load_config(path: &PathBuf) -> Config {
    let config = Config::read(path).expect("failed to read config");
    config.validate();

    config
}

/// Open the database and build a Xero sync from provided config.
///
/// # Panics
///
/// Panics if the database could not be opened or the Xero client could not be
/// built.
#[must_use]
pub fn build_xero_sync(config: &Config) -> XeroSync<Sqlite> {
    if let Some(dir) = config.database.path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir).expect("failed to create DB dir");
        }
    }
    let db_path = config
        .database
        .path
        .to_str()
        .expect("failed to cast DB path to string");
    let store = Sqlite::new(db_path).expect("failed to open database");

    XeroSync::builder(store)
        .token_url(&config.xero.token_url.to_string())
        .api_url(&config.xero.api_url.to_string())
        .connections_url(&config.xero.connections_url.to_string())
        .timeout(config.xero.timeout)
        .connection_timeout(config.xero.connection_timeout)
        .reservation_ttl(config.sync.reservation_ttl)
        .build()
        .expect("failed to build Xero sync")
}

/// Build an instance of `XeroSyncServer`. Reported payments are queued on
/// `payments`.
///
/// # Panics
///
/// Panics if the server could not be created (for example, if the specified
/// port could not be bound).
pub async fn build_server<S: Storage + 'static>(
    config: &Config,
    xero_sync: XeroSync<S>,
    payments: mpsc::Sender<Payment>,
) -> XeroSyncServer {
    let state = State::new(xero_sync, payments, config.xero.clone());
    let server = new_server(config.server.clone(), state)
        .await
        .expect("failed to start API server");
    debug!("Built API server");

    XeroSyncServer { inner: server }
}

/// An instance of `xerosync-server`.
pub struct XeroSyncServer {
    inner: Server,
}

impl XeroSyncServer {
    /// Return the ipv4 address of the server.
    ///
    /// # Errors
    ///
    /// Returns an IO error if there was an issue getting the address.
    pub fn ipv4_address(&self) -> Result<SocketAddr, IoError> {
        self.inner.ipv4_address()
    }
}

/// Serve until interrupted, then stop the payment listener and flush storage.
pub async fn run_server<S: Storage + 'static>(
    server: XeroSyncServer,
    listener: ListenerHandle,
    xero_sync: XeroSync<S>,
) {
    tokio::select! {
        () = server.inner.serve() => error!("API server stopped unexpectedly"),
        res = signal::ctrl_c() => match res {
            Ok(()) => info!("Received interrupt, shutting down"),
            Err(e) => error!("Failed to listen for interrupt: {e}"),
        },
    }

    if let Err(e) = listener.stop().await {
        error!("Payment listener did not stop cleanly: {e}");
    }
    if let Err(e) = xero_sync.flush().await {
        error!("Failed to flush storage: {e}");
    }
}
