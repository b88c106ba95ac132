//! `xerosync` can use a storage layer of your choosing. Consumers of this
//! library can use one of the existing storage layers found in [`stores`], or
//! can implement the [`Storage`] trait themselves for a custom storage
//! solution.

mod connection_storage;
mod payment_storage;
mod settings_storage;
pub mod stores;
mod synced_payment_storage;
mod wallet_storage;

use std::collections::HashSet;

use chrono::{DateTime, Utc};
pub use connection_storage::ConnectionStorage;
use log::error;
pub use payment_storage::PaymentStorage;
pub use settings_storage::SettingsStorage;
pub use synced_payment_storage::SyncedPaymentStorage;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
pub use wallet_storage::WalletStorage;

use crate::{
    Confirmation, ExtensionSettings, Payment, Reservation, SyncedPayment, WalletConfig,
    XeroConnection,
};

/// A supertrait of all necessary storage traits.
pub trait Storage:
    SettingsStorage + ConnectionStorage + WalletStorage + SyncedPaymentStorage + PaymentStorage
{
    /// Error type for the storage layer.
    type Error: std::error::Error + Send + 'static;

    /// Flush all changes to disk. This method should be manually implemented
    /// for any storage layer that does not automatically flush on write. The
    /// default implementation does nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if flush does not succeed.
    fn flush(&self) -> Result<(), <Self as Storage>::Error> {
        Ok(())
    }
}

/// The storage manager takes messages from a channel and runs the corresponding
/// storage method. This allows the blocking IO to be performed on a dedicated
/// task, and serializes every write, which is what makes reservations atomic.
struct Manager<S: Storage> {
    store: S,
    receiver: mpsc::Receiver<Method<S>>,
}

impl<S: Storage> Manager<S> {
    #[allow(clippy::too_many_lines)]
    fn handle(&mut self, message: Method<S>) {
        match message {
            Method::GetSettings { user_id, response } => {
                let result = SettingsStorage::get(&self.store, &user_id);
                respond(response, result, "GetSettings");
            }
            Method::UpsertSettings { settings, response } => {
                let result = SettingsStorage::upsert(&mut self.store, settings);
                respond(response, result, "UpsertSettings");
            }

            Method::GetConnection { user_id, response } => {
                let result = ConnectionStorage::get_latest(&self.store, &user_id);
                respond(response, result, "GetConnection");
            }
            Method::InsertConnection {
                connection,
                response,
            } => {
                let result = ConnectionStorage::insert(&mut self.store, connection);
                respond(response, result, "InsertConnection");
            }
            Method::UpdateConnection {
                connection,
                response,
            } => {
                let result = ConnectionStorage::update(&mut self.store, connection);
                respond(response, result, "UpdateConnection");
            }

            Method::InsertWallet { config, response } => {
                let result = WalletStorage::insert(&mut self.store, config);
                respond(response, result, "InsertWallet");
            }
            Method::UpdateWallet { config, response } => {
                let result = WalletStorage::update(&mut self.store, config);
                respond(response, result, "UpdateWallet");
            }
            Method::SetWalletSyncStatus {
                id,
                last_synced,
                status,
                response,
            } => {
                let result = self.store.set_sync_status(&id, last_synced, &status);
                respond(response, result, "SetWalletSyncStatus");
            }
            Method::GetWallet { id, response } => {
                let result = WalletStorage::get(&self.store, &id);
                respond(response, result, "GetWallet");
            }
            Method::GetPushingWallet { wallet, response } => {
                let result = self.store.get_pushing(&wallet);
                respond(response, result, "GetPushingWallet");
            }
            Method::RemoveWallet { id, response } => {
                let result = WalletStorage::remove(&mut self.store, &id);
                respond(response, result, "RemoveWallet");
            }

            Method::Reserve { record, response } => {
                let result = self.store.reserve(record);
                respond(response, result, "Reserve");
            }
            Method::Confirm {
                payment_hash,
                confirmation,
                response,
            } => {
                let result = self.store.confirm(&payment_hash, confirmation);
                respond(response, result, "Confirm");
            }
            Method::Release {
                payment_hash,
                response,
            } => {
                let result = self.store.release(&payment_hash);
                respond(response, result, "Release");
            }
            Method::GetSynced {
                payment_hash,
                response,
            } => {
                let result = SyncedPaymentStorage::get(&self.store, &payment_hash);
                respond(response, result, "GetSynced");
            }
            Method::SyncedHashes {
                wallet_id,
                response,
            } => {
                let result = self.store.hashes_for_wallet(&wallet_id);
                respond(response, result, "SyncedHashes");
            }
            Method::RemoveStale {
                reserved_before,
                response,
            } => {
                let result = self.store.remove_stale(reserved_before);
                respond(response, result, "RemoveStale");
            }

            Method::RecordPayment { payment, response } => {
                let result = self.store.record(payment);
                respond(response, result, "RecordPayment");
            }
            Method::CompletedIncoming {
                wallet_id,
                response,
            } => {
                let result = self.store.completed_incoming(&wallet_id);
                respond(response, result, "CompletedIncoming");
            }

            Method::Flush(response) => {
                let result = self.store.flush();
                respond(response, result, "Flush");
            }
        }
    }
}

fn respond<T>(response: oneshot::Sender<T>, result: T, method: &str) {
    if response.send(result).is_err() {
        error!("Failed to send {method} response to storage client.");
    }
}

type Response<T, E> = oneshot::Sender<Result<T, E>>;

enum Method<S: Storage> {
    GetSettings {
        user_id: String,
        response: Response<Option<ExtensionSettings>, <S as SettingsStorage>::Error>,
    },
    UpsertSettings {
        settings: ExtensionSettings,
        response: Response<Option<ExtensionSettings>, <S as SettingsStorage>::Error>,
    },
    GetConnection {
        user_id: String,
        response: Response<Option<XeroConnection>, <S as ConnectionStorage>::Error>,
    },
    InsertConnection {
        connection: XeroConnection,
        response: Response<(), <S as ConnectionStorage>::Error>,
    },
    UpdateConnection {
        connection: XeroConnection,
        response: Response<Option<XeroConnection>, <S as ConnectionStorage>::Error>,
    },
    InsertWallet {
        config: WalletConfig,
        response: Response<(), <S as WalletStorage>::Error>,
    },
    UpdateWallet {
        config: WalletConfig,
        response: Response<Option<WalletConfig>, <S as WalletStorage>::Error>,
    },
    SetWalletSyncStatus {
        id: String,
        last_synced: DateTime<Utc>,
        status: String,
        response: Response<Option<WalletConfig>, <S as WalletStorage>::Error>,
    },
    GetWallet {
        id: String,
        response: Response<Option<WalletConfig>, <S as WalletStorage>::Error>,
    },
    GetPushingWallet {
        wallet: String,
        response: Response<Option<WalletConfig>, <S as WalletStorage>::Error>,
    },
    RemoveWallet {
        id: String,
        response: Response<Option<WalletConfig>, <S as WalletStorage>::Error>,
    },
    Reserve {
        record: SyncedPayment,
        response: Response<Reservation, <S as SyncedPaymentStorage>::Error>,
    },
    Confirm {
        payment_hash: String,
        confirmation: Confirmation,
        response: Response<Option<SyncedPayment>, <S as SyncedPaymentStorage>::Error>,
    },
    Release {
        payment_hash: String,
        response: Response<Option<SyncedPayment>, <S as SyncedPaymentStorage>::Error>,
    },
    GetSynced {
        payment_hash: String,
        response: Response<Option<SyncedPayment>, <S as SyncedPaymentStorage>::Error>,
    },
    SyncedHashes {
        wallet_id: String,
        response: Response<HashSet<String>, <S as SyncedPaymentStorage>::Error>,
    },
    RemoveStale {
        reserved_before: DateTime<Utc>,
        response: Response<Vec<String>, <S as SyncedPaymentStorage>::Error>,
    },
    RecordPayment {
        payment: Payment,
        response: Response<Option<Payment>, <S as PaymentStorage>::Error>,
    },
    CompletedIncoming {
        wallet_id: String,
        response: Response<Vec<Payment>, <S as PaymentStorage>::Error>,
    },
    Flush(Response<(), <S as Storage>::Error>),
}

/// Async handle to a store running behind a [`Manager`].
pub(crate) struct Client<S: Storage>(mpsc::Sender<Method<S>>);

impl<S: Storage + 'static> Client<S> {
    pub(crate) fn new(store: S) -> Self {
        let (sender, receiver) = mpsc::channel(64);
        let mut manager = Manager { store, receiver };

        tokio::spawn(async move {
            while let Some(message) = manager.receiver.recv().await {
                manager.handle(message);
            }
        });

        Self(sender)
    }

    async fn call<T, E>(
        &self,
        method: impl FnOnce(Response<T, E>) -> Method<S>,
    ) -> Result<T, StorageError>
    where
        E: std::error::Error + Send + 'static,
    {
        let (sender, receiver) = oneshot::channel();
        self.0
            .send(method(sender))
            .await
            .map_err(|e| StorageError::Send(Box::new(e)))?;
        let response = receiver.await.map_err(|_| StorageError::Receive)?;
        response.map_err(|e| StorageError::Internal(Box::new(e)))
    }

    pub(crate) async fn get_settings(
        &self,
        user_id: &str,
    ) -> Result<Option<ExtensionSettings>, StorageError> {
        let user_id = user_id.to_string();
        self.call(|response| Method::GetSettings { user_id, response })
            .await
    }

    pub(crate) async fn upsert_settings(
        &self,
        settings: ExtensionSettings,
    ) -> Result<Option<ExtensionSettings>, StorageError> {
        self.call(|response| Method::UpsertSettings { settings, response })
            .await
    }

    pub(crate) async fn get_connection(
        &self,
        user_id: &str,
    ) -> Result<Option<XeroConnection>, StorageError> {
        let user_id = user_id.to_string();
        self.call(|response| Method::GetConnection { user_id, response })
            .await
    }

    pub(crate) async fn insert_connection(
        &self,
        connection: XeroConnection,
    ) -> Result<(), StorageError> {
        self.call(|response| Method::InsertConnection {
            connection,
            response,
        })
        .await
    }

    pub(crate) async fn update_connection(
        &self,
        connection: XeroConnection,
    ) -> Result<Option<XeroConnection>, StorageError> {
        self.call(|response| Method::UpdateConnection {
            connection,
            response,
        })
        .await
    }

    pub(crate) async fn insert_wallet(&self, config: WalletConfig) -> Result<(), StorageError> {
        self.call(|response| Method::InsertWallet { config, response })
            .await
    }

    pub(crate) async fn update_wallet(
        &self,
        config: WalletConfig,
    ) -> Result<Option<WalletConfig>, StorageError> {
        self.call(|response| Method::UpdateWallet { config, response })
            .await
    }

    pub(crate) async fn set_wallet_sync_status(
        &self,
        id: &str,
        last_synced: DateTime<Utc>,
        status: String,
    ) -> Result<Option<WalletConfig>, StorageError> {
        let id = id.to_string();
        self.call(|response| Method::SetWalletSyncStatus {
            id,
            last_synced,
            status,
            response,
        })
        .await
    }

    pub(crate) async fn get_wallet(&self, id: &str) -> Result<Option<WalletConfig>, StorageError> {
        let id = id.to_string();
        self.call(|response| Method::GetWallet { id, response }).await
    }

    pub(crate) async fn get_pushing_wallet(
        &self,
        wallet: &str,
    ) -> Result<Option<WalletConfig>, StorageError> {
        let wallet = wallet.to_string();
        self.call(|response| Method::GetPushingWallet { wallet, response })
            .await
    }

    pub(crate) async fn remove_wallet(
        &self,
        id: &str,
    ) -> Result<Option<WalletConfig>, StorageError> {
        let id = id.to_string();
        self.call(|response| Method::RemoveWallet { id, response })
            .await
    }

    pub(crate) async fn reserve(&self, record: SyncedPayment) -> Result<Reservation, StorageError> {
        self.call(|response| Method::Reserve { record, response })
            .await
    }

    pub(crate) async fn confirm(
        &self,
        payment_hash: &str,
        confirmation: Confirmation,
    ) -> Result<Option<SyncedPayment>, StorageError> {
        let payment_hash = payment_hash.to_string();
        self.call(|response| Method::Confirm {
            payment_hash,
            confirmation,
            response,
        })
        .await
    }

    pub(crate) async fn release(
        &self,
        payment_hash: &str,
    ) -> Result<Option<SyncedPayment>, StorageError> {
        let payment_hash = payment_hash.to_string();
        self.call(|response| Method::Release {
            payment_hash,
            response,
        })
        .await
    }

    pub(crate) async fn get_synced(
        &self,
        payment_hash: &str,
    ) -> Result<Option<SyncedPayment>, StorageError> {
        let payment_hash = payment_hash.to_string();
        self.call(|response| Method::GetSynced {
            payment_hash,
            response,
        })
        .await
    }

    pub(crate) async fn synced_hashes(
        &self,
        wallet_id: &str,
    ) -> Result<HashSet<String>, StorageError> {
        let wallet_id = wallet_id.to_string();
        self.call(|response| Method::SyncedHashes {
            wallet_id,
            response,
        })
        .await
    }

    pub(crate) async fn remove_stale(
        &self,
        reserved_before: DateTime<Utc>,
    ) -> Result<Vec<String>, StorageError> {
        self.call(|response| Method::RemoveStale {
            reserved_before,
            response,
        })
        .await
    }

    pub(crate) async fn record_payment(
        &self,
        payment: Payment,
    ) -> Result<Option<Payment>, StorageError> {
        self.call(|response| Method::RecordPayment { payment, response })
            .await
    }

    pub(crate) async fn completed_incoming(
        &self,
        wallet_id: &str,
    ) -> Result<Vec<Payment>, StorageError> {
        let wallet_id = wallet_id.to_string();
        self.call(|response| Method::CompletedIncoming {
            wallet_id,
            response,
        })
        .await
    }

    pub(crate) async fn flush(&self) -> Result<(), StorageError> {
        self.call(Method::Flush).await
    }
}

impl<S: Storage> Clone for Client<S> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

/// An error occurring while storing or retrieving values from a database.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to send message to the storage manager.
    #[error("failed to send message to the storage manager: {0}")]
    Send(Box<dyn std::error::Error + Send>),
    /// Failed to receive result from the storage manager.
    #[error("failed to receive result from the storage manager")]
    Receive,
    /// An error caused by the database, or some interaction with it.
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send>),
}
