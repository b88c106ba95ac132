//! # `xerosync-server`: Push Lightning payments to Xero.
//! `xerosync-server` is a standalone service around the `xerosync` library.
//!
//! If your application requires more flexibility than `xerosync-server`
//! offers, please see the [`xerosync`](../library/) library instead.

#![warn(clippy::pedantic)]
#![warn(missing_docs)]
#![warn(clippy::cargo)]
#![allow(clippy::module_name_repetitions)]

use xerosync_server::entrypoint;

#[tokio::main]
async fn main() {
    entrypoint().await;
}
