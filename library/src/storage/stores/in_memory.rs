use std::collections::{btree_map::Entry, BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{
    storage::{
        ConnectionStorage, PaymentStorage, SettingsStorage, Storage, SyncedPaymentStorage,
        WalletStorage,
    },
    Confirmation, ExtensionSettings, Payment, Reservation, SyncedPayment, WalletConfig,
    XeroConnection,
};

/// In-memory store. Nothing stored here survives a restart, including the
/// record of which payments were already pushed.
pub struct InMemory {
    settings: BTreeMap<String, ExtensionSettings>,
    connections: BTreeMap<String, XeroConnection>,
    wallets: BTreeMap<String, WalletConfig>,
    synced: BTreeMap<String, SyncedPayment>,
    payments: BTreeMap<String, Payment>,
}

impl InMemory {
    /// Create a new in-memory store.
    #[must_use]
    pub fn new() -> InMemory {
        InMemory {
            settings: BTreeMap::new(),
            connections: BTreeMap::new(),
            wallets: BTreeMap::new(),
            synced: BTreeMap::new(),
            payments: BTreeMap::new(),
        }
    }

    fn check_single_pusher(&self, config: &WalletConfig) -> Result<(), InMemoryStorageError> {
        let conflict = config.push_payments
            && self
                .wallets
                .values()
                .any(|other| other.id != config.id && other.push_payments && other.wallet == config.wallet);
        if conflict {
            return Err(InMemoryStorageError::DuplicatePusher(config.wallet.clone()));
        }
        Ok(())
    }
}

impl Default for InMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsStorage for InMemory {
    type Error = InMemoryStorageError;

    fn get(&self, user_id: &str) -> Result<Option<ExtensionSettings>, Self::Error> {
        Ok(self.settings.get(user_id).cloned())
    }

    fn upsert(
        &mut self,
        settings: ExtensionSettings,
    ) -> Result<Option<ExtensionSettings>, Self::Error> {
        Ok(self.settings.insert(settings.user_id.clone(), settings))
    }
}

impl ConnectionStorage for InMemory {
    type Error = InMemoryStorageError;

    fn get_latest(&self, user_id: &str) -> Result<Option<XeroConnection>, Self::Error> {
        Ok(self
            .connections
            .values()
            .filter(|connection| connection.user_id == user_id)
            .max_by_key(|connection| connection.updated_at)
            .cloned())
    }

    fn insert(&mut self, connection: XeroConnection) -> Result<(), Self::Error> {
        match self.connections.entry(connection.id.clone()) {
            Entry::Occupied(_) => Err(InMemoryStorageError::DuplicateConnection),
            Entry::Vacant(entry) => {
                entry.insert(connection);
                Ok(())
            }
        }
    }

    fn update(
        &mut self,
        connection: XeroConnection,
    ) -> Result<Option<XeroConnection>, Self::Error> {
        if let Entry::Occupied(mut entry) = self.connections.entry(connection.id.clone()) {
            return Ok(Some(entry.insert(connection)));
        }
        Ok(None)
    }
}

impl WalletStorage for InMemory {
    type Error = InMemoryStorageError;

    fn insert(&mut self, config: WalletConfig) -> Result<(), Self::Error> {
        if self.wallets.contains_key(&config.id) {
            return Err(InMemoryStorageError::DuplicateWallet);
        }
        self.check_single_pusher(&config)?;
        self.wallets.insert(config.id.clone(), config);
        Ok(())
    }

    fn update(&mut self, config: WalletConfig) -> Result<Option<WalletConfig>, Self::Error> {
        if !self.wallets.contains_key(&config.id) {
            return Ok(None);
        }
        self.check_single_pusher(&config)?;
        Ok(self.wallets.insert(config.id.clone(), config))
    }

    fn set_sync_status(
        &mut self,
        id: &str,
        last_synced: DateTime<Utc>,
        status: &str,
    ) -> Result<Option<WalletConfig>, Self::Error> {
        Ok(self.wallets.get_mut(id).map(|config| {
            config.last_synced = Some(last_synced);
            config.status = Some(status.to_string());
            config.clone()
        }))
    }

    fn get(&self, id: &str) -> Result<Option<WalletConfig>, Self::Error> {
        Ok(self.wallets.get(id).cloned())
    }

    fn get_pushing(&self, wallet: &str) -> Result<Option<WalletConfig>, Self::Error> {
        Ok(self
            .wallets
            .values()
            .find(|config| config.push_payments && config.wallet == wallet)
            .cloned())
    }

    fn remove(&mut self, id: &str) -> Result<Option<WalletConfig>, Self::Error> {
        Ok(self.wallets.remove(id))
    }
}

impl SyncedPaymentStorage for InMemory {
    type Error = InMemoryStorageError;

    fn reserve(&mut self, record: SyncedPayment) -> Result<Reservation, Self::Error> {
        match self.synced.entry(record.payment_hash.clone()) {
            Entry::Occupied(_) => Ok(Reservation::AlreadyExists),
            Entry::Vacant(entry) => {
                entry.insert(record);
                Ok(Reservation::Reserved)
            }
        }
    }

    fn confirm(
        &mut self,
        payment_hash: &str,
        confirmation: Confirmation,
    ) -> Result<Option<SyncedPayment>, Self::Error> {
        Ok(self.synced.get_mut(payment_hash).map(|record| {
            record.apply(confirmation);
            record.clone()
        }))
    }

    fn release(&mut self, payment_hash: &str) -> Result<Option<SyncedPayment>, Self::Error> {
        Ok(self.synced.remove(payment_hash))
    }

    fn get(&self, payment_hash: &str) -> Result<Option<SyncedPayment>, Self::Error> {
        Ok(self.synced.get(payment_hash).cloned())
    }

    fn hashes_for_wallet(&self, wallet_id: &str) -> Result<HashSet<String>, Self::Error> {
        Ok(self
            .synced
            .values()
            .filter(|record| record.wallet_id == wallet_id)
            .map(|record| record.payment_hash.clone())
            .collect())
    }

    fn remove_stale(&mut self, reserved_before: DateTime<Utc>) -> Result<Vec<String>, Self::Error> {
        let stale: Vec<String> = self
            .synced
            .values()
            .filter(|record| {
                !record.is_confirmed()
                    && record.xero_bank_transaction_id.is_none()
                    && record.reserved_at < reserved_before
            })
            .map(|record| record.payment_hash.clone())
            .collect();
        for payment_hash in &stale {
            self.synced.remove(payment_hash);
        }
        Ok(stale)
    }
}

impl PaymentStorage for InMemory {
    type Error = InMemoryStorageError;

    fn record(&mut self, payment: Payment) -> Result<Option<Payment>, Self::Error> {
        Ok(self.payments.insert(payment.payment_hash.clone(), payment))
    }

    fn completed_incoming(&self, wallet_id: &str) -> Result<Vec<Payment>, Self::Error> {
        Ok(self
            .payments
            .values()
            .filter(|payment| {
                payment.wallet_id == wallet_id && payment.is_incoming() && payment.is_completed()
            })
            .cloned()
            .collect())
    }
}

impl Storage for InMemory {
    type Error = InMemoryStorageError;
}

/// An error occurring while storing or retrieving values in memory.
#[derive(Error, Debug)]
pub enum InMemoryStorageError {
    /// Attempted to insert a connection which already exists.
    #[error("attempted to insert a connection which already exists")]
    DuplicateConnection,
    /// Attempted to insert a wallet configuration which already exists.
    #[error("attempted to insert a wallet configuration which already exists")]
    DuplicateWallet,
    /// Attempted to enable pushing on a wallet that is already pushed by
    /// another configuration.
    #[error("wallet {0} is already pushed by another configuration")]
    DuplicatePusher(String),
}
