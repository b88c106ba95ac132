use std::time::Duration;

use chrono::Utc;
use futures_util::future::join_all;
use test_case::test_case;
use testing_utils::{
    connection, init_logger, payment, pushing_wallet, MockXero, BANK_ACCOUNT_ID, USER_ID,
};
use xerosync::{
    storage::{
        stores::{InMemory, Sqlite},
        Storage,
    },
    PushOutcome, SkipReason, WalletConfig, XeroSync, XeroSyncError,
};

use crate::seeded;

#[test_case(InMemory::new(); "in-memory")]
#[test_case(Sqlite::new(":memory:").unwrap(); "sqlite")]
#[tokio::test]
async fn concurrent_pushes_reach_xero_once<S>(store: S)
where
    S: Storage + 'static,
{
    init_logger();
    let mock_xero = MockXero::start().await;
    let bank_transactions = mock_xero.mock_bank_transactions("bt-1");
    let xero_sync = mock_xero.xero_sync(seeded(store, Some(connection(1800)), pushing_wallet()));

    // The same payment notification delivered five times at once.
    let payment = payment("hash-1", "12.345", Utc::now());
    let outcomes = join_all((0..5).map(|_| xero_sync.on_payment(&payment))).await;

    let mut pushed = 0;
    for outcome in outcomes {
        match outcome.expect("push failed").expect("payment was ignored") {
            PushOutcome::Pushed {
                bank_transaction_id,
                amount,
                currency,
                ..
            } => {
                pushed += 1;
                assert_eq!(bank_transaction_id.as_deref(), Some("bt-1"));
                assert_eq!(amount.to_string(), "12.35");
                assert_eq!(currency, "USD");
            }
            PushOutcome::Skipped { reason, .. } => assert_eq!(reason, SkipReason::AlreadySynced),
            rejected @ PushOutcome::Rejected { .. } => panic!("unexpected outcome {rejected:?}"),
        }
    }
    assert_eq!(pushed, 1);
    bank_transactions.assert_hits_async(1).await;

    let synced = xero_sync
        .synced_payment("hash-1")
        .await
        .unwrap()
        .expect("payment is not recorded as synced");
    assert!(synced.is_confirmed());
    assert_eq!(synced.xero_bank_transaction_id.as_deref(), Some("bt-1"));
    assert_eq!(synced.user_id, USER_ID);
}

#[test_case(InMemory::new(); "in-memory")]
#[test_case(Sqlite::new(":memory:").unwrap(); "sqlite")]
#[tokio::test]
async fn rejected_push_can_be_retried<S>(store: S)
where
    S: Storage + 'static,
{
    init_logger();
    let mock_xero = MockXero::start().await;
    let mut failure = mock_xero.mock_bank_transaction_failure("hash-1", 500);
    let xero_sync = mock_xero.xero_sync(seeded(store, Some(connection(1800)), pushing_wallet()));
    let payment = payment("hash-1", "5", Utc::now());

    let outcome = xero_sync.on_payment(&payment).await.unwrap();
    assert!(matches!(
        outcome,
        Some(PushOutcome::Rejected { status, .. }) if status.as_u16() == 500
    ));
    assert!(xero_sync.synced_payment("hash-1").await.unwrap().is_none());

    // Xero recovers.
    failure.delete_async().await;
    let success = mock_xero.mock_bank_transactions("bt-2");
    let outcome = xero_sync.on_payment(&payment).await.unwrap();
    assert!(matches!(outcome, Some(PushOutcome::Pushed { .. })));
    success.assert_hits_async(1).await;
}

#[test_case(InMemory::new(); "in-memory")]
#[test_case(Sqlite::new(":memory:").unwrap(); "sqlite")]
#[tokio::test]
async fn unreachable_xero_rolls_back<S>(store: S)
where
    S: Storage + 'static,
{
    init_logger();
    let xero_sync = XeroSync::builder(seeded(store, Some(connection(1800)), pushing_wallet()))
        .api_url("http://127.0.0.1:1/api.xro/2.0")
        .connection_timeout(Duration::from_secs(1))
        .build()
        .unwrap();

    let result = xero_sync
        .on_payment(&payment("hash-1", "5", Utc::now()))
        .await;
    match result {
        Err(XeroSyncError::Xero(e)) => assert!(e.is_transport(), "unexpected error {e}"),
        other => panic!("expected a transport error, got {other:?}"),
    }
    assert!(xero_sync.synced_payment("hash-1").await.unwrap().is_none());
}

#[tokio::test]
async fn payments_of_other_wallets_are_ignored() {
    init_logger();
    let mock_xero = MockXero::start().await;
    let bank_transactions = mock_xero.mock_bank_transactions("bt-1");
    let xero_sync = mock_xero.xero_sync(seeded(
        InMemory::new(),
        Some(connection(1800)),
        pushing_wallet(),
    ));

    let mut payment = payment("hash-1", "5", Utc::now());
    payment.wallet_id = "another-wallet".to_string();
    assert_eq!(xero_sync.on_payment(&payment).await.unwrap(), None);
    bank_transactions.assert_hits_async(0).await;
}

#[tokio::test]
async fn disabled_push_is_ignored() {
    init_logger();
    let mock_xero = MockXero::start().await;
    let bank_transactions = mock_xero.mock_bank_transactions("bt-1");
    let mut wallet = pushing_wallet();
    wallet.push_payments = false;
    let xero_sync =
        mock_xero.xero_sync(seeded(InMemory::new(), Some(connection(1800)), wallet));

    let outcome = xero_sync
        .on_payment(&payment("hash-1", "5", Utc::now()))
        .await
        .unwrap();
    assert_eq!(outcome, None);
    bank_transactions.assert_hits_async(0).await;
}

#[tokio::test]
async fn missing_connection_is_ignored() {
    init_logger();
    let mock_xero = MockXero::start().await;
    let bank_transactions = mock_xero.mock_bank_transactions("bt-1");
    let xero_sync = mock_xero.xero_sync(seeded(InMemory::new(), None, pushing_wallet()));

    let outcome = xero_sync
        .on_payment(&payment("hash-1", "5", Utc::now()))
        .await
        .unwrap();
    assert_eq!(outcome, None);
    bank_transactions.assert_hits_async(0).await;
}

#[test_case(None; "unset")]
#[test_case(Some("00000000-0000-0000-0000-000000000000"); "placeholder")]
#[tokio::test]
async fn missing_bank_account_is_skipped(bank_account: Option<&str>) {
    init_logger();
    let mock_xero = MockXero::start().await;
    let bank_transactions = mock_xero.mock_bank_transactions("bt-1");
    let mut wallet: WalletConfig = pushing_wallet();
    wallet.xero_bank_account_id = bank_account.map(ToString::to_string);
    let xero_sync =
        mock_xero.xero_sync(seeded(InMemory::new(), Some(connection(1800)), wallet));

    let outcome = xero_sync
        .on_payment(&payment("hash-1", "5", Utc::now()))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        Some(PushOutcome::Skipped {
            payment_hash: "hash-1".to_string(),
            reason: SkipReason::MissingBankAccount,
        })
    );
    bank_transactions.assert_hits_async(0).await;
    assert!(xero_sync.synced_payment("hash-1").await.unwrap().is_none());
}

#[tokio::test]
async fn payload_sent_to_xero() {
    init_logger();
    let mock_xero = MockXero::start().await;
    let bank_transactions = mock_xero.mock(|when, then| {
        when.method(httpmock::Method::POST)
            .path("/api.xro/2.0/BankTransactions")
            .header("authorization", "Bearer stored-access-token")
            .json_body_partial(format!(
                r#"{{
                    "BankTransactions": [{{
                        "Type": "RECEIVE",
                        "Contact": {{ "Name": "LNbits Customer" }},
                        "BankAccount": {{ "AccountID": "{BANK_ACCOUNT_ID}" }},
                        "Reference": "invoice hash-1",
                        "CurrencyCode": "USD",
                        "LineItems": [{{ "Quantity": 1, "AccountCode": "200" }}]
                    }}]
                }}"#
            ));
        then.status(200).json_body(serde_json::json!({
            "BankTransactions": [{ "BankTransactionID": "bt-1" }]
        }));
    });
    let xero_sync = mock_xero.xero_sync(seeded(
        InMemory::new(),
        Some(connection(1800)),
        pushing_wallet(),
    ));

    let outcome = xero_sync
        .on_payment(&payment("hash-1", "7.10", Utc::now()))
        .await
        .unwrap();
    assert!(matches!(outcome, Some(PushOutcome::Pushed { .. })));
    bank_transactions.assert_hits_async(1).await;
}
