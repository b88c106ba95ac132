use axum::{
    extract::{Query, State as AxumState},
    response::{Html, IntoResponse, Redirect, Response},
};
use hyper::StatusCode;
use log::{error, info};
use serde::Deserialize;
use xerosync::{authorize_url, storage::Storage, XeroSyncError};

use crate::server::{api::ApiError, State};

const SUCCESS_PAGE: &str = "<html>
  <body>
    <h3>Xero connection successful</h3>
    <p>You can close this tab and return to your wallet.</p>
  </body>
</html>";

#[derive(Deserialize)]
pub(super) struct AuthorizeQuery {
    user: String,
}

/// Send the user to Xero's consent page.
pub(super) async fn authorize<S: Storage + 'static>(
    AxumState(state): AxumState<State<S>>,
    Query(AuthorizeQuery { user }): Query<AuthorizeQuery>,
) -> Result<Redirect, ApiError> {
    let credentials = state
        .xero_sync
        .settings(&user)
        .await?
        .credentials()
        .map_err(XeroSyncError::from)?;
    let authorization_state = state.xero_sync.begin_authorization(&user).await;
    let url = authorize_url(
        &state.xero.authorize_url.to_string(),
        &credentials.client_id,
        &state.xero.redirect_uri.to_string(),
        &state.xero.scopes,
        &authorization_state,
    );
    Ok(Redirect::to(&url))
}

#[derive(Deserialize)]
pub(super) struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
}

/// Where Xero sends the user back to after consent. `state` is the one issued
/// by [`authorize`], and identifies the user.
pub(super) async fn callback<S: Storage + 'static>(
    AxumState(state): AxumState<State<S>>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let (Some(code), Some(authorization_state)) = (query.code, query.state) else {
        error!("Xero OAuth callback is missing code or state");
        return (
            StatusCode::BAD_REQUEST,
            "Missing code or state in Xero callback.",
        )
            .into_response();
    };
    let Some(user) = state
        .xero_sync
        .take_authorization(&authorization_state)
        .await
    else {
        error!("Xero OAuth callback with an unknown or expired state");
        return (
            StatusCode::BAD_REQUEST,
            "Unknown or expired authorization. Please connect to Xero again.",
        )
            .into_response();
    };
    info!("Xero OAuth callback for user {user}");

    let redirect_uri = state.xero.redirect_uri.to_string();
    match state
        .xero_sync
        .complete_authorization(&user, &code, &redirect_uri)
        .await
    {
        Ok(_) => Html(SUCCESS_PAGE).into_response(),
        Err(XeroSyncError::Config(e)) => {
            error!("Could not connect user {user} to Xero: {e}");
            (StatusCode::BAD_REQUEST, format!("Could not connect to Xero: {e}.")).into_response()
        }
        Err(XeroSyncError::Xero(e)) => {
            error!("Xero rejected the authorization of user {user}: {e}");
            (StatusCode::BAD_REQUEST, "Failed to exchange code with Xero.").into_response()
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}
