use bytes::Bytes;
use hyper::http::StatusCode;
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::XeroError;

/// A raw Xero API response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// Response status.
    pub status: StatusCode,
    /// Response body.
    pub body: Bytes,
}

impl ApiResponse {
    /// Whether the status is in the 2xx range.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// The body, lossily decoded as UTF-8.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Parse the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not valid JSON of the expected shape.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, XeroError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Turn a non-success status into [`XeroError::Status`].
    ///
    /// # Errors
    ///
    /// Returns an error if the status is not in the 2xx range.
    pub fn error_for_status(self) -> Result<Self, XeroError> {
        if self.is_success() {
            return Ok(self);
        }
        Err(XeroError::Status {
            status: self.status,
            body: self.text(),
        })
    }

    /// `BankTransactionID` of the first transaction in a create response, if
    /// present.
    #[must_use]
    pub fn bank_transaction_id(&self) -> Option<String> {
        let body: serde_json::Value = self.json().ok()?;
        body.get("BankTransactions")?
            .get(0)?
            .get("BankTransactionID")?
            .as_str()
            .map(ToString::to_string)
    }
}

/// An organisation a token may act on.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    /// Organisation id.
    pub tenant_id: String,
    /// Organisation name.
    #[serde(default)]
    pub tenant_name: Option<String>,
    /// Kind of tenant, e.g. `ORGANISATION`.
    #[serde(default)]
    pub tenant_type: Option<String>,
}

/// An entry of a Xero chart of accounts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Account {
    /// Account id.
    #[serde(rename = "AccountID")]
    pub account_id: String,
    /// Account code. Bank accounts may have none.
    #[serde(default)]
    pub code: Option<String>,
    /// Account name.
    #[serde(default)]
    pub name: Option<String>,
    /// Account type, e.g. `REVENUE` or `BANK`.
    #[serde(rename = "Type", default)]
    pub account_type: Option<String>,
    /// Bank account number, for bank accounts.
    #[serde(default)]
    pub bank_account_number: Option<String>,
}

impl Account {
    /// Whether this is a bank account.
    #[must_use]
    pub fn is_bank(&self) -> bool {
        self.account_type.as_deref() == Some("BANK")
    }

    /// Picker option for choosing a revenue account code.
    #[must_use]
    pub fn code_option(&self) -> AccountOption {
        let value = self.code.clone().unwrap_or_else(|| self.account_id.clone());
        let label = match (&self.code, &self.name) {
            (Some(code), Some(name)) => format!("{code} – {name}"),
            (Some(code), None) => code.clone(),
            (None, Some(name)) => name.clone(),
            (None, None) => self.account_id.clone(),
        };
        AccountOption {
            value,
            label,
            account_type: self.account_type.clone(),
        }
    }

    /// Picker option for choosing a bank account.
    #[must_use]
    pub fn bank_option(&self) -> AccountOption {
        let name = self.name.as_deref().unwrap_or(&self.account_id);
        let label = match &self.bank_account_number {
            Some(number) if !number.is_empty() => format!("{name} ({number})"),
            _ => name.to_string(),
        };
        AccountOption {
            value: self.account_id.clone(),
            label,
            account_type: self.account_type.clone(),
        }
    }
}

/// A value/label pair for account pickers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountOption {
    /// Value to store.
    pub value: String,
    /// Text to show.
    pub label: String,
    /// Account type.
    #[serde(rename = "type")]
    pub account_type: Option<String>,
}

#[derive(Deserialize)]
pub(super) struct AccountsResponse {
    #[serde(rename = "Accounts", default)]
    pub accounts: Vec<Account>,
}

/// An entry of a Xero tax rate catalog. Every field is optional, since the
/// catalog differs between regions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TaxRate {
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Tax type code used on line items.
    #[serde(default)]
    pub tax_type: Option<String>,
    /// `ACTIVE`, `DELETED`, `ARCHIVED` or `PENDING`.
    #[serde(default)]
    pub status: Option<String>,
    /// Effective rate in percent.
    #[serde(default)]
    pub effective_rate: Option<Decimal>,
    /// Displayed rate in percent.
    #[serde(default)]
    pub display_tax_rate: Option<Decimal>,
    /// Whether the rate may be used on revenue.
    #[serde(default)]
    pub can_apply_to_revenue: Option<bool>,
}

#[derive(Deserialize)]
pub(super) struct TaxRatesResponse {
    #[serde(rename = "TaxRates", default)]
    pub tax_rates: Vec<TaxRate>,
}
