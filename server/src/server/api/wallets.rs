use axum::{
    extract::{Path, State as AxumState},
    Json,
};
use xerosync::storage::Storage;

use crate::server::{
    api::{ApiError, SimpleStatus},
    State,
};

/// Push every completed incoming payment of a wallet configuration's wallet.
pub(super) async fn push_wallet<S: Storage + 'static>(
    AxumState(state): AxumState<State<S>>,
    Path(id): Path<String>,
) -> Result<Json<SimpleStatus>, ApiError> {
    let summary = state.xero_sync.reconcile_wallet(&id).await?;
    Ok(Json(SimpleStatus {
        success: true,
        message: summary.to_string(),
    }))
}
