//! The `xerosync-server` HTTP API.

mod accounts;
mod oauth;
mod payments;
mod wallets;

use axum::{
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use hyper::StatusCode;
use log::error;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use xerosync::{storage::Storage, XeroSyncError};

use crate::server::State;

/// Routes meant for the wallet platform. Protected by the bearer token, if one
/// is configured.
pub(crate) fn api<S: Storage + 'static>(state: State<S>) -> Router {
    Router::new()
        .route("/api/v1/payments", post(payments::report_payment))
        .route("/api/v1/wallets/:id/push", post(wallets::push_wallet))
        .route("/api/v1/accounts", get(accounts::accounts))
        .route("/api/v1/bank_accounts", get(accounts::bank_accounts))
        .with_state(state)
}

/// Routes visited by users' browsers during the Xero OAuth flow.
pub(crate) fn oauth<S: Storage + 'static>(state: State<S>) -> Router {
    Router::new()
        .route("/oauth/authorize", get(oauth::authorize))
        .route("/oauth/callback", get(oauth::callback))
        .with_state(state)
}

/// Outcome of an operation, with a message meant for the user.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct SimpleStatus {
    /// Whether the operation succeeded.
    pub success: bool,
    /// What happened.
    pub message: String,
}

/// An error that can be sent back over the API to the client.
#[derive(Error, Debug)]
pub enum ApiError {
    /// An error originating from the `xerosync` library.
    #[error(transparent)]
    XeroSync(#[from] XeroSyncError),
    /// The payment listener no longer accepts payments.
    #[error("payment listener is not running")]
    ListenerStopped,
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::XeroSync(XeroSyncError::WalletNotFound(_)) => StatusCode::NOT_FOUND,
            Self::XeroSync(XeroSyncError::Config(_)) => StatusCode::BAD_REQUEST,
            Self::XeroSync(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ListenerStopped => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::XeroSync(e @ (XeroSyncError::WalletNotFound(_) | XeroSyncError::Config(_))) => {
                e.to_string()
            }
            Self::XeroSync(XeroSyncError::Xero(_)) => "Xero request failed".to_string(),
            Self::XeroSync(_) => "Internal error".to_string(),
            Self::ListenerStopped => "Payment listener is not running".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {self}");
        }
        let body = SimpleStatus {
            success: false,
            message: self.message(),
        };
        (status, Json(body)).into_response()
    }
}
