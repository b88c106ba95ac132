use axum::{
    extract::{Query, State as AxumState},
    http::HeaderValue,
    response::IntoResponse,
    Json,
};
use hyper::http::header::CACHE_CONTROL;
use serde::Deserialize;
use xerosync::storage::Storage;

use crate::server::{api::ApiError, State};

#[derive(Deserialize)]
pub(super) struct UserQuery {
    user: String,
}

/// Chart of accounts of the user's Xero organisation.
pub(super) async fn accounts<S: Storage + 'static>(
    AxumState(state): AxumState<State<S>>,
    Query(UserQuery { user }): Query<UserQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let accounts = state.xero_sync.accounts(&user).await?;
    Ok((
        [(CACHE_CONTROL, HeaderValue::from_static("no-store"))],
        Json(accounts),
    ))
}

/// Bank accounts of the user's Xero organisation.
pub(super) async fn bank_accounts<S: Storage + 'static>(
    AxumState(state): AxumState<State<S>>,
    Query(UserQuery { user }): Query<UserQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let accounts = state.xero_sync.bank_accounts(&user).await?;
    Ok((
        [(CACHE_CONTROL, HeaderValue::from_static("no-store"))],
        Json(accounts),
    ))
}
