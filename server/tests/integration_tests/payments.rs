use std::time::Duration;

use chrono::Utc;
use hyper::StatusCode;
use testing_utils::{connection, init_logger, payment, pushing_wallet, MockXero};
use tokio::time::sleep;
use xerosync::{
    storage::{stores::InMemory, PaymentStorage, Storage},
    XeroSync,
};
use xerosync_server::api::SimpleStatus;

use crate::{
    common::{start_server, ApiClient, TOKEN},
    seeded,
};

async fn wait_until_synced<S: Storage + 'static>(xero_sync: &XeroSync<S>, payment_hash: &str) {
    for _ in 0..100 {
        if let Some(synced) = xero_sync.synced_payment(payment_hash).await.unwrap() {
            if synced.is_confirmed() {
                return;
            }
        }
        sleep(Duration::from_millis(50)).await;
    }
    panic!("payment {payment_hash} was never synced");
}

#[tokio::test]
async fn reported_payment_is_pushed() {
    init_logger();
    let mock_xero = MockXero::start().await;
    let bank_transactions = mock_xero.mock_bank_transactions("bt-1");
    let xero_sync = mock_xero.xero_sync(seeded(
        InMemory::new(),
        Some(connection(1800)),
        pushing_wallet(),
    ));
    let address = start_server(xero_sync.clone(), Some(TOKEN)).await;
    let client = ApiClient::new(address);

    let body = serde_json::to_value(payment("hash-1", "12.34", Utc::now())).unwrap();
    let response = client.post("/api/v1/payments", Some(body.clone())).await;
    assert_eq!(response.status, StatusCode::ACCEPTED);
    // Duplicate notifications are pushed once.
    let response = client.post("/api/v1/payments", Some(body)).await;
    assert_eq!(response.status, StatusCode::ACCEPTED);

    wait_until_synced(&xero_sync, "hash-1").await;
    let synced = xero_sync.synced_payment("hash-1").await.unwrap().unwrap();
    assert_eq!(synced.xero_bank_transaction_id.as_deref(), Some("bt-1"));
    bank_transactions.assert_hits_async(1).await;
}

#[tokio::test]
async fn malformed_payment_is_rejected() {
    init_logger();
    let mock_xero = MockXero::start().await;
    let xero_sync = mock_xero.xero_sync(seeded(InMemory::new(), None, pushing_wallet()));
    let address = start_server(xero_sync, Some(TOKEN)).await;
    let client = ApiClient::new(address);

    let response = client
        .post(
            "/api/v1/payments",
            Some(serde_json::json!({ "payment_hash": "hash-1" })),
        )
        .await;
    assert!(response.status.is_client_error());
}

#[tokio::test]
async fn push_wallet_replays_recorded_payments() {
    init_logger();
    let mock_xero = MockXero::start().await;
    mock_xero.mock_bank_transaction_failure("hash-2", 400);
    let bank_transactions = mock_xero.mock_bank_transactions("bt-1");
    let mut store = seeded(InMemory::new(), Some(connection(1800)), pushing_wallet());
    let now = Utc::now();
    PaymentStorage::record(&mut store, payment("hash-1", "1.00", now)).unwrap();
    PaymentStorage::record(&mut store, payment("hash-2", "2.00", now)).unwrap();
    let xero_sync = mock_xero.xero_sync(store);
    let address = start_server(xero_sync, Some(TOKEN)).await;
    let client = ApiClient::new(address);

    let response = client
        .post("/api/v1/wallets/wallet-config-1/push", None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let status: SimpleStatus = response.json();
    assert!(status.success);
    assert_eq!(
        status.message,
        "Pushed 1 payment(s); skipped 0; failed 1. Errors: hash-2: HTTP 400"
    );
    bank_transactions.assert_hits_async(1).await;

    // Already pushed payments are skipped on the next run.
    let response = client
        .post("/api/v1/wallets/wallet-config-1/push", None)
        .await;
    let status: SimpleStatus = response.json();
    assert!(status.message.starts_with("Pushed 0 payment(s); skipped 1; failed 1."));
    bank_transactions.assert_hits_async(1).await;
}

#[tokio::test]
async fn push_unknown_wallet() {
    init_logger();
    let mock_xero = MockXero::start().await;
    let xero_sync = mock_xero.xero_sync(seeded(InMemory::new(), None, pushing_wallet()));
    let address = start_server(xero_sync, Some(TOKEN)).await;
    let client = ApiClient::new(address);

    let response = client.post("/api/v1/wallets/nope/push", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    let status: SimpleStatus = response.json();
    assert!(!status.success);
    assert_eq!(status.message, "wallet configuration nope not found");
}

#[tokio::test]
async fn push_without_connection() {
    init_logger();
    let mock_xero = MockXero::start().await;
    let xero_sync = mock_xero.xero_sync(seeded(InMemory::new(), None, pushing_wallet()));
    let address = start_server(xero_sync, Some(TOKEN)).await;
    let client = ApiClient::new(address);

    let response = client
        .post("/api/v1/wallets/wallet-config-1/push", None)
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    let status: SimpleStatus = response.json();
    assert_eq!(
        status.message,
        "configuration error: user user-1 has no Xero connection"
    );
}
