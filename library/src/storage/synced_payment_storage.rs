use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::{Confirmation, Reservation, SyncedPayment};

/// De-duplication ledger of payments pushed to Xero.
///
/// Payment hashes are unique. A second [`reserve`](Self::reserve) for the same
/// hash must report [`Reservation::AlreadyExists`] rather than fail, since
/// that is how concurrent pushes of one payment are resolved.
pub trait SyncedPaymentStorage: Send + Sync {
    /// Error type for the storage layer.
    type Error: std::error::Error + Send + 'static;

    /// Store an unconfirmed reservation, unless a record with the same payment
    /// hash already exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the reservation could not be stored for any reason
    /// other than an existing record.
    fn reserve(&mut self, record: SyncedPayment) -> Result<Reservation, Self::Error>;

    /// Confirm the record of `payment_hash`, returning the updated record, or
    /// `None` if there was none.
    ///
    /// # Errors
    ///
    /// Returns an error if the record could not be updated.
    fn confirm(
        &mut self,
        payment_hash: &str,
        confirmation: Confirmation,
    ) -> Result<Option<SyncedPayment>, Self::Error>;

    /// Remove the record of `payment_hash`, returning it if it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the record could not be removed.
    fn release(&mut self, payment_hash: &str) -> Result<Option<SyncedPayment>, Self::Error>;

    /// Get the record of `payment_hash`.
    ///
    /// # Errors
    ///
    /// Returns an error if the record could not be retrieved.
    fn get(&self, payment_hash: &str) -> Result<Option<SyncedPayment>, Self::Error>;

    /// Payment hashes of every record (confirmed or not) for a wallet.
    ///
    /// # Errors
    ///
    /// Returns an error if the records could not be retrieved.
    fn hashes_for_wallet(&self, wallet_id: &str) -> Result<HashSet<String>, Self::Error>;

    /// Remove unconfirmed reservations made before `reserved_before`,
    /// returning their payment hashes. Records carrying a Xero transaction id
    /// are kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the records could not be removed.
    fn remove_stale(&mut self, reserved_before: DateTime<Utc>) -> Result<Vec<String>, Self::Error>;
}
