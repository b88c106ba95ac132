use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::new_id;

/// Record of a payment pushed, or being pushed, to Xero.
///
/// A record starts out as a reservation with no `confirmed_at`. It is either
/// confirmed once Xero accepts the transaction, or removed if the push fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncedPayment {
    /// Identity of this record.
    pub id: String,
    /// Owning user.
    pub user_id: String,
    /// Underlying wallet identifier.
    pub wallet_id: String,
    /// Payment hash. Unique across all records.
    pub payment_hash: String,
    /// Xero `BankTransactionID`, when Xero reported one.
    pub xero_bank_transaction_id: Option<String>,
    /// Currency of the created transaction.
    pub currency: Option<String>,
    /// Amount of the created transaction, in major units.
    pub amount: Option<Decimal>,
    /// When the reservation was made.
    pub reserved_at: DateTime<Utc>,
    /// When Xero accepted the transaction.
    pub confirmed_at: Option<DateTime<Utc>>,
}

impl SyncedPayment {
    /// A new, unconfirmed reservation.
    pub fn reservation(
        user_id: impl Into<String>,
        wallet_id: impl Into<String>,
        payment_hash: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        SyncedPayment {
            id: new_id(),
            user_id: user_id.into(),
            wallet_id: wallet_id.into(),
            payment_hash: payment_hash.into(),
            xero_bank_transaction_id: None,
            currency: None,
            amount: None,
            reserved_at: now,
            confirmed_at: None,
        }
    }

    /// Whether Xero accepted this payment.
    #[must_use]
    pub fn is_confirmed(&self) -> bool {
        self.confirmed_at.is_some()
    }

    /// Mark this record confirmed with the given details.
    pub fn apply(&mut self, confirmation: Confirmation) {
        self.xero_bank_transaction_id = confirmation.xero_bank_transaction_id;
        self.currency = Some(confirmation.currency);
        self.amount = Some(confirmation.amount);
        self.confirmed_at = Some(confirmation.confirmed_at);
    }
}

/// Details recorded when Xero accepts a pushed payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    /// Xero `BankTransactionID`, if it could be read from the response.
    pub xero_bank_transaction_id: Option<String>,
    /// Currency of the created transaction.
    pub currency: String,
    /// Amount of the created transaction, in major units.
    pub amount: Decimal,
    /// When Xero accepted the transaction.
    pub confirmed_at: DateTime<Utc>,
}

/// Result of trying to reserve a payment hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    /// The reservation was stored.
    Reserved,
    /// A record for this payment hash already exists.
    AlreadyExists,
}
