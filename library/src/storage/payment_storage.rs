use crate::Payment;

/// Journal of payments reported by the wallet platform, used to replay a
/// wallet's history.
pub trait PaymentStorage: Send + Sync {
    /// Error type for the storage layer.
    type Error: std::error::Error + Send + 'static;

    /// Record a payment, replacing any earlier record with the same hash.
    /// Returns the replaced record.
    ///
    /// # Errors
    ///
    /// Returns an error if the payment could not be stored.
    fn record(&mut self, payment: Payment) -> Result<Option<Payment>, Self::Error>;

    /// Completed incoming payments of a wallet, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns an error if the payments could not be retrieved.
    fn completed_incoming(&self, wallet_id: &str) -> Result<Vec<Payment>, Self::Error>;
}
