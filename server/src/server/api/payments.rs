use axum::{extract::State as AxumState, response::IntoResponse, Json};
use hyper::StatusCode;
use log::debug;
use xerosync::{storage::Storage, Payment};

use crate::server::{api::ApiError, State};

/// Paid-invoice notification from the wallet platform. The payment is added to
/// the journal replayed by batch pushes and queued for the listener.
pub(super) async fn report_payment<S: Storage + 'static>(
    AxumState(state): AxumState<State<S>>,
    Json(payment): Json<Payment>,
) -> Result<impl IntoResponse, ApiError> {
    debug!(
        "Payment {} reported for wallet {}",
        payment.payment_hash, payment.wallet_id
    );
    state.xero_sync.record_payment(payment.clone()).await?;
    state
        .payments
        .send(payment)
        .await
        .map_err(|_| ApiError::ListenerStopped)?;
    Ok(StatusCode::ACCEPTED)
}
