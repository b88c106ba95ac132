use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key under which the platform's fiat conversion records the currency code.
pub const FIAT_CURRENCY_KEY: &str = "wallet_fiat_currency";
/// Key under which the platform's fiat conversion records the fiat amount.
pub const FIAT_AMOUNT_KEY: &str = "wallet_fiat_amount";

/// A Lightning payment as reported by the wallet platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    /// Globally unique payment hash.
    pub payment_hash: String,
    /// Identifier of the wallet the payment belongs to.
    pub wallet_id: String,
    /// Amount in millisatoshis. Positive for incoming payments, negative for
    /// outgoing ones.
    pub amount_msat: i64,
    /// Settlement state.
    #[serde(default)]
    pub status: PaymentStatus,
    /// Free-text memo attached to the invoice.
    #[serde(default)]
    pub memo: Option<String>,
    /// Time the payment was made.
    pub time: DateTime<Utc>,
    /// Metadata attached by other platform components, such as the fiat
    /// conversion at invoice time.
    #[serde(default)]
    pub extra: Map<String, Value>,
}

impl Payment {
    /// Whether this payment credits the wallet.
    #[must_use]
    pub fn is_incoming(&self) -> bool {
        self.amount_msat > 0
    }

    /// Whether this payment has settled.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == PaymentStatus::Success
    }

    /// Fiat currency code recorded when the invoice was created, if any.
    #[must_use]
    pub fn fiat_currency(&self) -> Option<&str> {
        self.extra
            .get(FIAT_CURRENCY_KEY)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|currency| !currency.is_empty())
    }

    /// Fiat amount recorded when the invoice was created, if any. Accepts both
    /// JSON numbers and numeric strings.
    #[must_use]
    pub fn fiat_amount(&self) -> Option<Decimal> {
        match self.extra.get(FIAT_AMOUNT_KEY)? {
            Value::Number(number) => parse_decimal(&number.to_string()),
            Value::String(string) => parse_decimal(string.trim()),
            _ => None,
        }
    }
}

fn parse_decimal(input: &str) -> Option<Decimal> {
    Decimal::from_str(input)
        .or_else(|_| Decimal::from_scientific(input))
        .ok()
}

/// Settlement state of a [`Payment`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Not yet settled.
    Pending,
    /// Settled.
    #[default]
    Success,
    /// Failed or expired.
    Failed,
}
