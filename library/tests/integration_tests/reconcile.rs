use chrono::{Duration, Utc};
use test_case::test_case;
use testing_utils::{
    connection, init_logger, payment, pushing_wallet, MockXero, WALLET_CONFIG_ID, WALLET_ID,
};
use xerosync::{
    storage::{
        stores::{InMemory, Sqlite},
        Storage, SyncedPaymentStorage,
    },
    ConfigError, PaymentStatus, ReconcileSummary, SyncedPayment, XeroSyncError,
};

use crate::seeded;

#[test_case(InMemory::new(); "in-memory")]
#[test_case(Sqlite::new(":memory:").unwrap(); "sqlite")]
#[tokio::test]
async fn failed_payment_does_not_stop_batch<S>(store: S)
where
    S: Storage + 'static,
{
    init_logger();
    let mock_xero = MockXero::start().await;
    // Defined first so it takes precedence for the second payment.
    let failure = mock_xero.mock_bank_transaction_failure("hash-2", 400);
    let success = mock_xero.mock_bank_transactions("bt");
    let xero_sync = mock_xero.xero_sync(seeded(store, Some(connection(1800)), pushing_wallet()));

    let start = Utc::now() - Duration::hours(3);
    for (hash, offset) in [("hash-3", 2), ("hash-1", 0), ("hash-2", 1)] {
        xero_sync
            .record_payment(payment(hash, "10", start + Duration::hours(offset)))
            .await
            .unwrap();
    }

    let summary = xero_sync.reconcile_wallet(WALLET_CONFIG_ID).await.unwrap();
    assert_eq!(
        summary,
        ReconcileSummary {
            pushed: 2,
            skipped: 0,
            failed: 1,
            errors: vec!["hash-2: HTTP 400".to_string()],
        }
    );
    failure.assert_hits_async(1).await;
    success.assert_hits_async(2).await;

    // Oldest first.
    let first = xero_sync.synced_payment("hash-1").await.unwrap().unwrap();
    let third = xero_sync.synced_payment("hash-3").await.unwrap().unwrap();
    assert!(first.confirmed_at < third.confirmed_at);
    assert!(xero_sync.synced_payment("hash-2").await.unwrap().is_none());

    let wallet = xero_sync.wallet(WALLET_CONFIG_ID).await.unwrap().unwrap();
    assert!(wallet.last_synced.is_some());
    assert_eq!(
        wallet.status.as_deref(),
        Some("Pushed 2 payment(s); skipped 0; failed 1. Errors: hash-2: HTTP 400")
    );
}

#[test_case(InMemory::new(); "in-memory")]
#[test_case(Sqlite::new(":memory:").unwrap(); "sqlite")]
#[tokio::test]
async fn second_run_pushes_nothing<S>(store: S)
where
    S: Storage + 'static,
{
    init_logger();
    let mock_xero = MockXero::start().await;
    let success = mock_xero.mock_bank_transactions("bt");
    let xero_sync = mock_xero.xero_sync(seeded(store, Some(connection(1800)), pushing_wallet()));

    let now = Utc::now();
    for (i, hash) in ["hash-1", "hash-2", "hash-3"].into_iter().enumerate() {
        xero_sync
            .record_payment(payment(hash, "1.5", now - Duration::minutes(i as i64)))
            .await
            .unwrap();
    }

    let first = xero_sync.reconcile_wallet(WALLET_CONFIG_ID).await.unwrap();
    assert_eq!((first.pushed, first.skipped, first.failed), (3, 0, 0));
    let second = xero_sync.reconcile_wallet(WALLET_CONFIG_ID).await.unwrap();
    assert_eq!((second.pushed, second.skipped, second.failed), (0, 3, 0));
    assert_eq!(second.to_string(), "Pushed 0 payment(s); skipped 3; failed 0.");
    success.assert_hits_async(3).await;
}

#[test_case(InMemory::new(); "in-memory")]
#[test_case(Sqlite::new(":memory:").unwrap(); "sqlite")]
#[tokio::test]
async fn edits_during_batch_are_kept<S>(store: S)
where
    S: Storage + 'static,
{
    init_logger();
    let mock_xero = MockXero::start().await;
    // Each push takes 100 ms, leaving time to edit the configuration.
    let success = mock_xero.mock_bank_transactions("bt");
    let xero_sync = mock_xero.xero_sync(seeded(store, Some(connection(1800)), pushing_wallet()));
    let now = Utc::now();
    for (i, hash) in ["hash-1", "hash-2", "hash-3"].into_iter().enumerate() {
        xero_sync
            .record_payment(payment(hash, "2", now - Duration::minutes(i as i64)))
            .await
            .unwrap();
    }

    let batch = tokio::spawn({
        let xero_sync = xero_sync.clone();
        async move { xero_sync.reconcile_wallet(WALLET_CONFIG_ID).await }
    });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    let mut edited = xero_sync.wallet(WALLET_CONFIG_ID).await.unwrap().unwrap();
    edited.push_payments = false;
    edited.xero_bank_account_id = Some("new-bank".to_string());
    xero_sync.update_wallet(edited).await.unwrap();

    let summary = batch.await.unwrap().unwrap();
    assert_eq!(summary.pushed, 3);
    success.assert_hits_async(3).await;

    let stored = xero_sync.wallet(WALLET_CONFIG_ID).await.unwrap().unwrap();
    assert!(!stored.push_payments);
    assert_eq!(stored.xero_bank_account_id.as_deref(), Some("new-bank"));
    assert!(stored.last_synced.is_some());
    assert_eq!(
        stored.status.as_deref(),
        Some("Pushed 3 payment(s); skipped 0; failed 0.")
    );
}

#[tokio::test]
async fn pusher_moved_during_batch() {
    init_logger();
    let mock_xero = MockXero::start().await;
    mock_xero.mock_bank_transactions("bt");
    let xero_sync = mock_xero.xero_sync(seeded(
        InMemory::new(),
        Some(connection(1800)),
        pushing_wallet(),
    ));
    let now = Utc::now();
    for hash in ["hash-1", "hash-2"] {
        xero_sync.record_payment(payment(hash, "2", now)).await.unwrap();
    }

    let batch = tokio::spawn({
        let xero_sync = xero_sync.clone();
        async move { xero_sync.reconcile_wallet(WALLET_CONFIG_ID).await }
    });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    let mut disabled = xero_sync.wallet(WALLET_CONFIG_ID).await.unwrap().unwrap();
    disabled.push_payments = false;
    xero_sync.update_wallet(disabled).await.unwrap();
    let mut replacement = pushing_wallet();
    replacement.id = "cfg-2".to_string();
    xero_sync.insert_wallet(replacement).await.unwrap();

    let summary = batch.await.unwrap().unwrap();
    assert_eq!((summary.pushed, summary.failed), (2, 0));

    let original = xero_sync.wallet(WALLET_CONFIG_ID).await.unwrap().unwrap();
    assert!(!original.push_payments);
    assert_eq!(
        original.status.as_deref(),
        Some("Pushed 2 payment(s); skipped 0; failed 0.")
    );
    let replacement = xero_sync.wallet("cfg-2").await.unwrap().unwrap();
    assert!(replacement.push_payments);
    assert_eq!(replacement.status, None);
}

#[tokio::test]
async fn only_completed_incoming_payments_are_replayed() {
    init_logger();
    let mock_xero = MockXero::start().await;
    let success = mock_xero.mock_bank_transactions("bt");
    let xero_sync = mock_xero.xero_sync(seeded(
        InMemory::new(),
        Some(connection(1800)),
        pushing_wallet(),
    ));

    let now = Utc::now();
    let mut outgoing = payment("outgoing", "3", now);
    outgoing.amount_msat = -5_000;
    let mut pending = payment("pending", "3", now);
    pending.status = PaymentStatus::Pending;
    let mut elsewhere = payment("elsewhere", "3", now);
    elsewhere.wallet_id = "another-wallet".to_string();
    let mut no_fiat = payment("no-fiat", "3", now);
    no_fiat.extra.clear();
    for p in [outgoing, pending, elsewhere, no_fiat, payment("good", "3", now)] {
        xero_sync.record_payment(p).await.unwrap();
    }

    let summary = xero_sync.reconcile_wallet(WALLET_CONFIG_ID).await.unwrap();
    assert_eq!((summary.pushed, summary.skipped, summary.failed), (1, 1, 0));
    success.assert_hits_async(1).await;
}

#[tokio::test]
async fn orphaned_reservation_is_retried() {
    init_logger();
    let mock_xero = MockXero::start().await;
    let success = mock_xero.mock_bank_transactions("bt");
    let mut store = seeded(InMemory::new(), Some(connection(1800)), pushing_wallet());
    // Left behind by a process that stopped mid-push an hour ago.
    SyncedPaymentStorage::reserve(
        &mut store,
        SyncedPayment::reservation(
            "user-1",
            WALLET_ID,
            "hash-1",
            Utc::now() - Duration::hours(1),
        ),
    )
    .unwrap();
    let xero_sync = mock_xero.xero_sync(store);
    xero_sync
        .record_payment(payment("hash-1", "4", Utc::now()))
        .await
        .unwrap();

    let summary = xero_sync.reconcile_wallet(WALLET_CONFIG_ID).await.unwrap();
    assert_eq!(summary.pushed, 1);
    success.assert_hits_async(1).await;
    assert!(xero_sync
        .synced_payment("hash-1")
        .await
        .unwrap()
        .unwrap()
        .is_confirmed());
}

#[tokio::test]
async fn fresh_reservation_is_respected() {
    init_logger();
    let mock_xero = MockXero::start().await;
    let success = mock_xero.mock_bank_transactions("bt");
    let mut store = seeded(InMemory::new(), Some(connection(1800)), pushing_wallet());
    // Another push of this payment is in flight.
    SyncedPaymentStorage::reserve(
        &mut store,
        SyncedPayment::reservation("user-1", WALLET_ID, "hash-1", Utc::now()),
    )
    .unwrap();
    let xero_sync = mock_xero.xero_sync(store);
    xero_sync
        .record_payment(payment("hash-1", "4", Utc::now()))
        .await
        .unwrap();

    let summary = xero_sync.reconcile_wallet(WALLET_CONFIG_ID).await.unwrap();
    assert_eq!((summary.pushed, summary.skipped), (0, 1));
    success.assert_hits_async(0).await;
}

#[tokio::test]
async fn missing_connection_aborts_batch() {
    init_logger();
    let mock_xero = MockXero::start().await;
    let success = mock_xero.mock_bank_transactions("bt");
    let xero_sync = mock_xero.xero_sync(seeded(InMemory::new(), None, pushing_wallet()));
    xero_sync
        .record_payment(payment("hash-1", "4", Utc::now()))
        .await
        .unwrap();

    let result = xero_sync.reconcile_wallet(WALLET_CONFIG_ID).await;
    assert!(matches!(
        result,
        Err(XeroSyncError::Config(ConfigError::MissingConnection(_)))
    ));
    success.assert_hits_async(0).await;
    let wallet = xero_sync.wallet(WALLET_CONFIG_ID).await.unwrap().unwrap();
    assert_eq!(wallet.last_synced, None);
}

#[tokio::test]
async fn unknown_wallet_configuration() {
    init_logger();
    let mock_xero = MockXero::start().await;
    let xero_sync = mock_xero.xero_sync(seeded(
        InMemory::new(),
        Some(connection(1800)),
        pushing_wallet(),
    ));

    assert!(matches!(
        xero_sync.reconcile_wallet("nope").await,
        Err(XeroSyncError::WalletNotFound(id)) if id == "nope"
    ));
}
