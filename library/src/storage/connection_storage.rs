use crate::XeroConnection;

/// Storage of [`XeroConnection`]s.
///
/// A user may accumulate several connection records over time; the one with
/// the latest `updated_at` is current.
pub trait ConnectionStorage: Send + Sync {
    /// Error type for the storage layer.
    type Error: std::error::Error + Send + 'static;

    /// Get the current connection of a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection could not be retrieved.
    fn get_latest(&self, user_id: &str) -> Result<Option<XeroConnection>, Self::Error>;

    /// Insert a new connection.
    ///
    /// # Errors
    ///
    /// Returns an error if a connection with the same id already exists, or if
    /// the connection could not be stored.
    fn insert(&mut self, connection: XeroConnection) -> Result<(), Self::Error>;

    /// Replace an existing connection (matched by id), returning the old one.
    /// Returns `None` and stores nothing if there was no such connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection could not be stored.
    fn update(&mut self, connection: XeroConnection)
        -> Result<Option<XeroConnection>, Self::Error>;
}
