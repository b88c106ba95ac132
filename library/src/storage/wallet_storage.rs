use chrono::{DateTime, Utc};

use crate::WalletConfig;

/// Storage of [`WalletConfig`]s.
///
/// Implementations must refuse any write that would leave two configurations
/// with `push_payments` enabled for the same underlying wallet.
pub trait WalletStorage: Send + Sync {
    /// Error type for the storage layer.
    type Error: std::error::Error + Send + 'static;

    /// Insert a new wallet configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration with the same id exists, if another
    /// configuration already pushes the same wallet, or if the configuration
    /// could not be stored.
    fn insert(&mut self, config: WalletConfig) -> Result<(), Self::Error>;

    /// Replace an existing configuration (matched by id), returning the old
    /// one. Returns `None` and stores nothing if there was no such
    /// configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if another configuration already pushes the same
    /// wallet, or if the configuration could not be stored.
    fn update(&mut self, config: WalletConfig) -> Result<Option<WalletConfig>, Self::Error>;

    /// Set the outcome of the last batch run of a configuration, leaving every
    /// other field as stored. Returns the updated configuration, or `None` if
    /// there was no such configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration could not be updated.
    fn set_sync_status(
        &mut self,
        id: &str,
        last_synced: DateTime<Utc>,
        status: &str,
    ) -> Result<Option<WalletConfig>, Self::Error>;

    /// Get a configuration by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration could not be retrieved.
    fn get(&self, id: &str) -> Result<Option<WalletConfig>, Self::Error>;

    /// Get the configuration pushing payments of the given underlying wallet.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration could not be retrieved.
    fn get_pushing(&self, wallet: &str) -> Result<Option<WalletConfig>, Self::Error>;

    /// Remove a configuration by id, returning it if it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration could not be removed.
    fn remove(&mut self, id: &str) -> Result<Option<WalletConfig>, Self::Error>;
}
