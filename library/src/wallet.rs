use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Bank account id Xero uses as a placeholder for "no account".
pub const ZERO_ACCOUNT_ID: &str = "00000000-0000-0000-0000-000000000000";
/// Revenue account code used when the wallet does not name one.
pub const DEFAULT_ACCOUNT_CODE: &str = "200";
/// Name of the wallet platform, used in default descriptions and contacts.
pub const PLATFORM_NAME: &str = "LNbits";

/// Per-wallet sync configuration.
///
/// Optional fields resolve to their documented defaults through the accessor
/// methods, so callers never have to probe for missing values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Identity of this configuration.
    pub id: String,
    /// Owning user.
    pub user_id: String,
    /// Underlying wallet identifier.
    pub wallet: String,
    /// Pull from Xero (reserved for future use).
    #[serde(default)]
    pub pull_payments: bool,
    /// Push incoming payments to Xero. At most one configuration per
    /// underlying wallet may have this enabled.
    #[serde(default)]
    pub push_payments: bool,
    /// Contact name used on created transactions.
    #[serde(default)]
    pub reconcile_name: Option<String>,
    /// Revenue account code used on created transactions.
    #[serde(default)]
    pub reconcile_mode: Option<String>,
    /// Xero bank account receiving the transactions.
    #[serde(default)]
    pub xero_bank_account_id: Option<String>,
    /// Which of the user's tax mappings applies.
    #[serde(default)]
    pub tax_rate: TaxRateCategory,
    /// Fee handling flag (stored, not yet acted upon).
    #[serde(default)]
    pub fee_handling: bool,
    /// Mark created transactions as reconciled.
    #[serde(default)]
    pub auto_reconcile: bool,
    /// Time of the last batch sync.
    #[serde(default)]
    pub last_synced: Option<DateTime<Utc>>,
    /// Human readable result of the last batch sync.
    #[serde(default)]
    pub status: Option<String>,
    /// User notes.
    #[serde(default)]
    pub notes: Option<String>,
}

impl WalletConfig {
    /// Create a configuration with every optional setting at its default.
    pub fn new(id: impl Into<String>, user_id: impl Into<String>, wallet: impl Into<String>) -> Self {
        WalletConfig {
            id: id.into(),
            user_id: user_id.into(),
            wallet: wallet.into(),
            pull_payments: false,
            push_payments: false,
            reconcile_name: None,
            reconcile_mode: None,
            xero_bank_account_id: None,
            tax_rate: TaxRateCategory::None,
            fee_handling: false,
            auto_reconcile: false,
            last_synced: None,
            status: None,
            notes: None,
        }
    }

    /// The configured Xero bank account, unless it is blank or the all-zero
    /// placeholder.
    #[must_use]
    pub fn bank_account_id(&self) -> Option<&str> {
        non_blank(self.xero_bank_account_id.as_deref()).filter(|id| *id != ZERO_ACCOUNT_ID)
    }

    /// Revenue account code, defaulting to [`DEFAULT_ACCOUNT_CODE`].
    #[must_use]
    pub fn account_code(&self) -> &str {
        non_blank(self.reconcile_mode.as_deref()).unwrap_or(DEFAULT_ACCOUNT_CODE)
    }

    /// Contact name, defaulting to "`<platform>` Customer".
    #[must_use]
    pub fn contact_name(&self) -> String {
        non_blank(self.reconcile_name.as_deref())
            .map_or_else(|| format!("{PLATFORM_NAME} Customer"), ToString::to_string)
    }
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Tax mapping category selected on a wallet.
///
/// Unknown or missing values are read as [`TaxRateCategory::None`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum TaxRateCategory {
    /// The user's standard rate.
    Standard,
    /// The user's zero rate.
    Zero,
    /// The user's exempt rate.
    Exempt,
    /// No tax type on created transactions.
    #[default]
    None,
}

impl TaxRateCategory {
    /// Lowercase name, or `None` for [`TaxRateCategory::None`].
    #[must_use]
    pub fn as_str(self) -> Option<&'static str> {
        match self {
            TaxRateCategory::Standard => Some("standard"),
            TaxRateCategory::Zero => Some("zero"),
            TaxRateCategory::Exempt => Some("exempt"),
            TaxRateCategory::None => None,
        }
    }
}

impl From<&str> for TaxRateCategory {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "standard" => TaxRateCategory::Standard,
            "zero" => TaxRateCategory::Zero,
            "exempt" => TaxRateCategory::Exempt,
            _ => TaxRateCategory::None,
        }
    }
}

impl From<Option<String>> for TaxRateCategory {
    fn from(value: Option<String>) -> Self {
        value.as_deref().map_or(TaxRateCategory::None, TaxRateCategory::from)
    }
}

impl From<TaxRateCategory> for Option<String> {
    fn from(value: TaxRateCategory) -> Self {
        value.as_str().map(ToString::to_string)
    }
}

impl fmt::Display for TaxRateCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str().unwrap_or("none"))
    }
}
