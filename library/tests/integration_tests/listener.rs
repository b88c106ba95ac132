use std::time::Duration;

use chrono::Utc;
use testing_utils::{connection, init_logger, payment, pushing_wallet, MockXero};
use tokio::{sync::mpsc, time::sleep};
use xerosync::{storage::stores::InMemory, storage::Storage, XeroSync};

use crate::seeded;

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
async fn listener_pushes_reported_payments() {
    init_logger();
    let mock_xero = MockXero::start().await;
    let bank_transactions = mock_xero.mock_bank_transactions("bt-1");
    let xero_sync = mock_xero.xero_sync(seeded(
        InMemory::new(),
        Some(connection(1800)),
        pushing_wallet(),
    ));

    let (sender, receiver) = mpsc::channel(8);
    let listener = xero_sync.listen(receiver);

    let now = Utc::now();
    sender.send(payment("hash-1", "2", now)).await.unwrap();
    // Duplicate notifications of one payment.
    sender.send(payment("hash-2", "3", now)).await.unwrap();
    sender.send(payment("hash-2", "3", now)).await.unwrap();

    wait_until_synced(&xero_sync, "hash-1").await;
    wait_until_synced(&xero_sync, "hash-2").await;
    listener.stop().await.unwrap();
    bank_transactions.assert_hits_async(2).await;
}

#[tokio::test]
async fn listener_stops_when_source_closes() {
    init_logger();
    let mock_xero = MockXero::start().await;
    let xero_sync = mock_xero.xero_sync(seeded(
        InMemory::new(),
        Some(connection(1800)),
        pushing_wallet(),
    ));

    let (sender, receiver) = mpsc::channel(8);
    let listener = xero_sync.listen(receiver);
    drop(sender);

    for _ in 0..100 {
        if listener.is_finished() {
            break;
        }
        sleep(Duration::from_millis(10)).await;
    }
    assert!(listener.is_finished());
    listener.stop().await.unwrap();
}

#[tokio::test]
async fn failed_push_does_not_stop_listener() {
    init_logger();
    let mock_xero = MockXero::start().await;
    let failure = mock_xero.mock_bank_transaction_failure("hash-1", 503);
    let success = mock_xero.mock_bank_transactions("bt-2");
    let xero_sync = mock_xero.xero_sync(seeded(
        InMemory::new(),
        Some(connection(1800)),
        pushing_wallet(),
    ));

    let (sender, receiver) = mpsc::channel(8);
    let listener = xero_sync.listen(receiver);
    sender.send(payment("hash-1", "2", Utc::now())).await.unwrap();
    sender.send(payment("hash-2", "2", Utc::now())).await.unwrap();

    wait_until_synced(&xero_sync, "hash-2").await;
    assert!(!listener.is_finished());
    listener.stop().await.unwrap();
    failure.assert_hits_async(1).await;
    success.assert_hits_async(1).await;
    assert!(xero_sync.synced_payment("hash-1").await.unwrap().is_none());
}
