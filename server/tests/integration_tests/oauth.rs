use hyper::{header::LOCATION, StatusCode};
use serde_json::json;
use testing_utils::{init_logger, pushing_wallet, MockXero, TENANT_ID, USER_ID};
use xerosync::storage::stores::InMemory;

use crate::{
    common::{start_server, ApiClient, TOKEN},
    seeded,
};

const AUTHORIZE_PREFIX: &str = "https://login.xero.com/identity/connect/authorize?response_type=code\
     &client_id=client-id\
     &redirect_uri=http%3A%2F%2Flocalhost%3A8080%2Foauth%2Fcallback\
     &scope=openid%20profile%20email%20accounting.settings%20accounting.transactions%20offline_access\
     &state=";

/// Start an authorization for `user` and return the `state` Xero would echo
/// back.
async fn authorization_state(client: &ApiClient, user: &str) -> String {
    let response = client.get(&format!("/oauth/authorize?user={user}")).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    let location = response.headers[LOCATION].to_str().unwrap();
    location
        .strip_prefix(AUTHORIZE_PREFIX)
        .expect("unexpected authorize URL")
        .to_string()
}

#[tokio::test]
async fn authorize_redirects_to_xero() {
    init_logger();
    let mock_xero = MockXero::start().await;
    let xero_sync = mock_xero.xero_sync(seeded(InMemory::new(), None, pushing_wallet()));
    let address = start_server(xero_sync, Some(TOKEN)).await;
    let client = ApiClient::new(address);

    let first = authorization_state(&client, USER_ID).await;
    let second = authorization_state(&client, USER_ID).await;
    assert_eq!(first.len(), 22);
    assert!(first.chars().all(|c| c.is_ascii_alphanumeric()));
    assert_ne!(first, USER_ID);
    assert_ne!(first, second);
}

#[tokio::test]
async fn authorize_without_credentials() {
    init_logger();
    let mock_xero = MockXero::start().await;
    let xero_sync = mock_xero.xero_sync(InMemory::new());
    let address = start_server(xero_sync, Some(TOKEN)).await;
    let client = ApiClient::new(address);

    let response = client.get("/oauth/authorize?user=someone").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn callback_connects_organisation() {
    init_logger();
    let mock_xero = MockXero::start().await;
    let exchange = mock_xero.mock_token("authorization_code", "fresh-access-token", 1800);
    mock_xero.mock_connections(&[TENANT_ID]);
    mock_xero.mock_tax_rates(json!([{
        "Name": "Sales Tax",
        "TaxType": "OUTPUT",
        "Status": "ACTIVE",
        "EffectiveRate": 8.5,
        "CanApplyToRevenue": true,
    }]));
    let xero_sync = mock_xero.xero_sync(seeded(InMemory::new(), None, pushing_wallet()));
    let address = start_server(xero_sync.clone(), Some(TOKEN)).await;
    let client = ApiClient::new(address);

    let state = authorization_state(&client, USER_ID).await;
    let response = client
        .get(&format!("/oauth/callback?code=auth-code&state={state}"))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.text().contains("Xero connection successful"));
    exchange.assert_hits_async(1).await;

    let connection = xero_sync.connection(USER_ID).await.unwrap().unwrap();
    assert_eq!(connection.tenant_id, TENANT_ID);
    assert_eq!(connection.access_token, "fresh-access-token");
    let settings = xero_sync.settings(USER_ID).await.unwrap();
    assert_eq!(settings.xero_tax_standard.as_deref(), Some("OUTPUT"));
}

#[tokio::test]
async fn callback_with_rejected_code() {
    init_logger();
    let mock_xero = MockXero::start().await;
    mock_xero.mock_token_failure(400);
    let xero_sync = mock_xero.xero_sync(seeded(InMemory::new(), None, pushing_wallet()));
    let address = start_server(xero_sync.clone(), Some(TOKEN)).await;
    let client = ApiClient::new(address);

    let state = authorization_state(&client, USER_ID).await;
    let response = client
        .get(&format!("/oauth/callback?code=bad-code&state={state}"))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(xero_sync.connection(USER_ID).await.unwrap(), None);
}

#[tokio::test]
async fn callback_missing_code() {
    init_logger();
    let mock_xero = MockXero::start().await;
    let exchange = mock_xero.mock_token("authorization_code", "fresh-access-token", 1800);
    let xero_sync = mock_xero.xero_sync(seeded(InMemory::new(), None, pushing_wallet()));
    let address = start_server(xero_sync, Some(TOKEN)).await;
    let client = ApiClient::new(address);

    let response = client.get("/oauth/callback?state=user-1").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.text(), "Missing code or state in Xero callback.");
    exchange.assert_hits_async(0).await;
}

#[tokio::test]
async fn callback_with_forged_state() {
    init_logger();
    let mock_xero = MockXero::start().await;
    let exchange = mock_xero.mock_token("authorization_code", "fresh-access-token", 1800);
    let xero_sync = mock_xero.xero_sync(seeded(InMemory::new(), None, pushing_wallet()));
    let address = start_server(xero_sync.clone(), Some(TOKEN)).await;
    let client = ApiClient::new(address);

    // A user id is not a valid state.
    let response = client
        .get(&format!("/oauth/callback?code=auth-code&state={USER_ID}"))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.text(),
        "Unknown or expired authorization. Please connect to Xero again."
    );
    exchange.assert_hits_async(0).await;
    assert_eq!(xero_sync.connection(USER_ID).await.unwrap(), None);
}

#[tokio::test]
async fn callback_state_is_single_use() {
    init_logger();
    let mock_xero = MockXero::start().await;
    let exchange = mock_xero.mock_token("authorization_code", "fresh-access-token", 1800);
    mock_xero.mock_connections(&[TENANT_ID]);
    mock_xero.mock_tax_rates(json!([]));
    let xero_sync = mock_xero.xero_sync(seeded(InMemory::new(), None, pushing_wallet()));
    let address = start_server(xero_sync, Some(TOKEN)).await;
    let client = ApiClient::new(address);

    let state = authorization_state(&client, USER_ID).await;
    let callback = format!("/oauth/callback?code=auth-code&state={state}");
    assert_eq!(client.get(&callback).await.status, StatusCode::OK);
    assert_eq!(client.get(&callback).await.status, StatusCode::BAD_REQUEST);
    exchange.assert_hits_async(1).await;
}
