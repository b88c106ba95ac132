use crate::ExtensionSettings;

/// Storage of per-user [`ExtensionSettings`].
pub trait SettingsStorage: Send + Sync {
    /// Error type for the storage layer.
    type Error: std::error::Error + Send + 'static;

    /// Get the settings of a user, if any have been stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings could not be retrieved.
    fn get(&self, user_id: &str) -> Result<Option<ExtensionSettings>, Self::Error>;

    /// Insert or replace the settings of `settings.user_id`, returning the
    /// previous settings if there were any.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings could not be stored.
    fn upsert(
        &mut self,
        settings: ExtensionSettings,
    ) -> Result<Option<ExtensionSettings>, Self::Error>;
}
