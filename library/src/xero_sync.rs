use std::{collections::HashMap, ops::Deref, sync::Arc, time::Duration};

use chrono::Utc;
use log::{debug, error, info};
use tokio::sync::Mutex;

use crate::{
    authorization::PendingAuthorization,
    storage::{self, Storage},
    xero_client::{
        AccountOption, LedgerClient, XeroClient, XeroEndpoints, DEFAULT_API_URL,
        DEFAULT_CONNECTIONS_URL, DEFAULT_TOKEN_URL,
    },
    AccessToken, ConfigError, Confirmation, ExtensionSettings, Payment, SyncedPayment,
    WalletConfig, XeroConnection, XeroSyncError,
};

/// Timeout for connection formation.
const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);
/// Timeout for total call completion.
const DEFAULT_TOTAL_TIMEOUT: Duration = Duration::from_secs(10);
/// Age after which an unconfirmed reservation is considered orphaned.
const DEFAULT_RESERVATION_TTL: Duration = Duration::from_secs(15 * 60);

/// The `XeroSync` pushes payments to Xero and keeps the records needed to do
/// so: user settings, OAuth connections, wallet configurations, the ledger of
/// synced payments and the journal of received payments.
pub struct XeroSync<S: Storage, C: LedgerClient = XeroClient>(pub(crate) Arc<XeroSyncInner<S, C>>);

#[doc(hidden)]
pub struct XeroSyncInner<S: Storage, C: LedgerClient> {
    pub(crate) store: storage::Client<S>,
    pub(crate) client: C,
    pub(crate) reservation_ttl: Duration,
    /// Pushes Xero accepted but whose confirmation could not be stored, by
    /// payment hash.
    pub(crate) unconfirmed: Mutex<HashMap<String, Confirmation>>,
    /// One lock per user, held while that user's token is checked and
    /// refreshed.
    pub(crate) token_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    /// Authorizations waiting for Xero's callback, by `state`.
    pub(crate) authorizations: Mutex<HashMap<String, PendingAuthorization>>,
}

impl<S: Storage, C: LedgerClient> Clone for XeroSync<S, C> {
    fn clone(&self) -> Self {
        XeroSync(self.0.clone())
    }
}

impl<S: Storage, C: LedgerClient> Deref for XeroSync<S, C> {
    type Target = XeroSyncInner<S, C>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S: Storage + 'static> XeroSync<S> {
    /// Returns a builder used to create a new `XeroSync`.
    #[must_use]
    pub fn builder(store: S) -> XeroSyncBuilder<S> {
        XeroSyncBuilder::new(store)
    }
}

impl<S: Storage + 'static, C: LedgerClient> XeroSync<S, C> {
    /// Settings of a user. Empty settings are created and stored on first
    /// access.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings could not be read or created.
    pub async fn settings(&self, user_id: &str) -> Result<ExtensionSettings, XeroSyncError> {
        if let Some(settings) = self.store.get_settings(user_id).await? {
            return Ok(settings);
        }
        debug!("Creating empty settings for user {user_id}");
        let settings = ExtensionSettings::new(user_id);
        self.store.upsert_settings(settings.clone()).await?;
        Ok(settings)
    }

    /// Replace the settings of `settings.user_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings could not be stored.
    pub async fn update_settings(
        &self,
        mut settings: ExtensionSettings,
    ) -> Result<ExtensionSettings, XeroSyncError> {
        settings.updated_at = Some(Utc::now());
        self.store.upsert_settings(settings.clone()).await?;
        Ok(settings)
    }

    /// The current Xero connection of a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection could not be read.
    pub async fn connection(&self, user_id: &str) -> Result<Option<XeroConnection>, XeroSyncError> {
        Ok(self.store.get_connection(user_id).await?)
    }

    /// A valid access token for a user, refreshing it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingConnection`] if the user has no connection,
    /// and otherwise the errors of [`XeroSync::ensure_access_token`].
    pub async fn access_token(&self, user_id: &str) -> Result<AccessToken, XeroSyncError> {
        let mut connection = self
            .connection(user_id)
            .await?
            .ok_or_else(|| ConfigError::MissingConnection(user_id.to_string()))?;
        let settings = self.settings(user_id).await?;
        self.ensure_access_token(&mut connection, &settings).await
    }

    /// The user's chart of accounts, as picker options.
    ///
    /// # Errors
    ///
    /// Returns an error if no valid token could be obtained or Xero could not
    /// be queried.
    pub async fn accounts(&self, user_id: &str) -> Result<Vec<AccountOption>, XeroSyncError> {
        let token = self.access_token(user_id).await?;
        let accounts = self.client.accounts(&token).await?;
        Ok(accounts.iter().map(|account| account.code_option()).collect())
    }

    /// The user's bank accounts, as picker options.
    ///
    /// # Errors
    ///
    /// Returns an error if no valid token could be obtained or Xero could not
    /// be queried.
    pub async fn bank_accounts(&self, user_id: &str) -> Result<Vec<AccountOption>, XeroSyncError> {
        let token = self.access_token(user_id).await?;
        let accounts = self.client.accounts(&token).await?;
        Ok(accounts
            .iter()
            .filter(|account| account.is_bank())
            .map(|account| account.bank_option())
            .collect())
    }

    /// Store a new wallet configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration could not be stored, including
    /// when another configuration already pushes the same wallet.
    pub async fn insert_wallet(&self, config: WalletConfig) -> Result<(), XeroSyncError> {
        Ok(self.store.insert_wallet(config).await?)
    }

    /// Replace a wallet configuration.
    ///
    /// # Errors
    ///
    /// Returns [`XeroSyncError::WalletNotFound`] if there is no configuration
    /// with this id, or an error if it could not be stored.
    pub async fn update_wallet(&self, config: WalletConfig) -> Result<(), XeroSyncError> {
        let id = config.id.clone();
        self.store
            .update_wallet(config)
            .await?
            .ok_or(XeroSyncError::WalletNotFound(id))?;
        Ok(())
    }

    /// Get a wallet configuration by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration could not be read.
    pub async fn wallet(&self, id: &str) -> Result<Option<WalletConfig>, XeroSyncError> {
        Ok(self.store.get_wallet(id).await?)
    }

    /// Remove a wallet configuration. Its synced payment records are kept, so
    /// a new configuration for the same wallet will not push them again.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration could not be removed.
    pub async fn remove_wallet(&self, id: &str) -> Result<Option<WalletConfig>, XeroSyncError> {
        Ok(self.store.remove_wallet(id).await?)
    }

    /// The synced payment record of a payment hash, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the record could not be read.
    pub async fn synced_payment(
        &self,
        payment_hash: &str,
    ) -> Result<Option<SyncedPayment>, XeroSyncError> {
        Ok(self.store.get_synced(payment_hash).await?)
    }

    /// Add a payment reported by the platform to the journal replayed by
    /// [`XeroSync::reconcile_wallet`].
    ///
    /// # Errors
    ///
    /// Returns an error if the payment could not be stored.
    pub async fn record_payment(&self, payment: Payment) -> Result<(), XeroSyncError> {
        self.store.record_payment(payment).await?;
        Ok(())
    }

    /// Remove reservations that were never confirmed nor rolled back within the
    /// reservation TTL, which can only happen if the process stopped mid-push.
    /// Returns the number of reservations removed.
    ///
    /// Confirmations that failed to be stored earlier are retried first, and
    /// nothing is removed while any of them is still outstanding.
    ///
    /// # Errors
    ///
    /// Returns an error if an outstanding confirmation could not be stored or
    /// the reservations could not be removed.
    pub async fn sweep_stale_reservations(&self) -> Result<usize, XeroSyncError> {
        self.retry_confirmations().await?;

        let ttl = chrono::Duration::from_std(self.reservation_ttl)
            .unwrap_or_else(|_| chrono::Duration::days(1));
        let removed = self.store.remove_stale(Utc::now() - ttl).await?;
        for payment_hash in &removed {
            info!("Removed orphaned reservation of payment {payment_hash}");
        }
        Ok(removed.len())
    }

    pub(crate) async fn retry_confirmations(&self) -> Result<(), XeroSyncError> {
        let mut unconfirmed = self.unconfirmed.lock().await;
        let pending: Vec<(String, Confirmation)> = unconfirmed.drain().collect();
        let mut first_error = None;
        for (payment_hash, confirmation) in pending {
            match self.store.confirm(&payment_hash, confirmation.clone()).await {
                Ok(_) => info!("Stored delayed confirmation of payment {payment_hash}"),
                Err(e) => {
                    error!("Still unable to confirm payment {payment_hash}: {e}");
                    unconfirmed.insert(payment_hash, confirmation);
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    /// Flush all changes to the storage layer.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails to flush.
    pub async fn flush(&self) -> Result<(), XeroSyncError> {
        Ok(self.store.flush().await?)
    }
}

/// A builder for the [`XeroSync`]. Used to configure Xero endpoints, timeouts
/// and the reservation TTL.
pub struct XeroSyncBuilder<S> {
    store: S,
    token_url: String,
    api_url: String,
    connections_url: String,
    total_timeout: Duration,
    connection_timeout: Duration,
    reservation_ttl: Duration,
}

impl<S: Storage + 'static> XeroSyncBuilder<S> {
    /// Create a new builder using the given store.
    #[must_use]
    pub fn new(store: S) -> XeroSyncBuilder<S> {
        XeroSyncBuilder {
            store,
            token_url: DEFAULT_TOKEN_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            connections_url: DEFAULT_CONNECTIONS_URL.to_string(),
            total_timeout: DEFAULT_TOTAL_TIMEOUT,
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
            reservation_ttl: DEFAULT_RESERVATION_TTL,
        }
    }

    /// OAuth2 token endpoint. Defaults to
    /// [https://identity.xero.com/connect/token](https://identity.xero.com/connect/token).
    #[must_use]
    pub fn token_url(mut self, url: &str) -> XeroSyncBuilder<S> {
        self.token_url = url.to_string();
        self
    }

    /// Accounting API base. Defaults to
    /// [https://api.xero.com/api.xro/2.0](https://api.xero.com/api.xro/2.0).
    #[must_use]
    pub fn api_url(mut self, url: &str) -> XeroSyncBuilder<S> {
        self.api_url = url.to_string();
        self
    }

    /// Connections endpoint. Defaults to
    /// [https://api.xero.com/connections](https://api.xero.com/connections).
    #[must_use]
    pub fn connections_url(mut self, url: &str) -> XeroSyncBuilder<S> {
        self.connections_url = url.to_string();
        self
    }

    /// Time before a Xero call times out. Defaults to 10 seconds.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> XeroSyncBuilder<S> {
        self.total_timeout = timeout;
        self
    }

    /// Time before a Xero call times out while failing to connect. Defaults to
    /// 5 seconds.
    #[must_use]
    pub fn connection_timeout(mut self, timeout: Duration) -> XeroSyncBuilder<S> {
        self.connection_timeout = timeout;
        self
    }

    /// Age after which an unconfirmed reservation is removed by
    /// [`XeroSync::sweep_stale_reservations`]. Must comfortably exceed the
    /// call timeout. Defaults to 15 minutes.
    #[must_use]
    pub fn reservation_ttl(mut self, ttl: Duration) -> XeroSyncBuilder<S> {
        self.reservation_ttl = ttl;
        self
    }

    /// Build the `XeroSync` with a [`XeroClient`]. Must be called from within a
    /// tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the configured URLs is invalid.
    pub fn build(self) -> Result<XeroSync<S>, XeroSyncError> {
        let endpoints = XeroEndpoints::new(&self.token_url, &self.api_url, &self.connections_url)?;
        let client = XeroClient::new(endpoints, self.total_timeout, self.connection_timeout);
        Ok(self.build_with_client(client))
    }

    /// Build the `XeroSync` with a custom ledger client. Endpoint and timeout
    /// settings of this builder are ignored. Must be called from within a tokio
    /// runtime.
    pub fn build_with_client<C: LedgerClient>(self, client: C) -> XeroSync<S, C> {
        XeroSync(Arc::new(XeroSyncInner {
            store: storage::Client::new(self.store),
            client,
            reservation_ttl: self.reservation_ttl,
            unconfirmed: Mutex::new(HashMap::new()),
            token_locks: Mutex::new(HashMap::new()),
            authorizations: Mutex::new(HashMap::new()),
        }))
    }
}
