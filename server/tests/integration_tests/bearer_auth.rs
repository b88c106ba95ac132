use hyper::StatusCode;
use test_case::test_case;
use testing_utils::{connection, init_logger, pushing_wallet, MockXero};
use xerosync::storage::stores::InMemory;

use crate::{
    common::{start_server, ApiClient, TOKEN},
    seeded,
};

#[test_case(Some("supersecrettoken") => StatusCode::OK; "correct token")]
#[test_case(Some("I am the wrong token!") => StatusCode::UNAUTHORIZED; "wrong token")]
#[test_case(None => StatusCode::UNAUTHORIZED; "missing token")]
#[tokio::test]
async fn bearer_auth(token: Option<&str>) -> StatusCode {
    init_logger();
    let mock_xero = MockXero::start().await;
    let xero_sync = mock_xero.xero_sync(seeded(
        InMemory::new(),
        Some(connection(1800)),
        pushing_wallet(),
    ));
    let address = start_server(xero_sync, Some(TOKEN)).await;

    let mut client = ApiClient::new(address);
    client.token = token.map(ToString::to_string);

    client
        .post("/api/v1/wallets/wallet-config-1/push", None)
        .await
        .status
}

#[tokio::test]
async fn no_token_configured() {
    init_logger();
    let mock_xero = MockXero::start().await;
    let xero_sync = mock_xero.xero_sync(seeded(
        InMemory::new(),
        Some(connection(1800)),
        pushing_wallet(),
    ));
    let address = start_server(xero_sync, None).await;

    let mut client = ApiClient::new(address);
    client.token = None;

    let response = client
        .post("/api/v1/wallets/wallet-config-1/push", None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn oauth_routes_are_public() {
    init_logger();
    let mock_xero = MockXero::start().await;
    let xero_sync = mock_xero.xero_sync(seeded(InMemory::new(), None, pushing_wallet()));
    let address = start_server(xero_sync, Some(TOKEN)).await;

    let mut client = ApiClient::new(address);
    client.token = None;

    let response = client.get("/oauth/authorize?user=user-1").await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
}
