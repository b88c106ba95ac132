//! Mapping of a payment onto a Xero `RECEIVE` bank transaction.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::{wallet::non_blank, ExtensionSettings, Payment, WalletConfig, PLATFORM_NAME};

/// Format of `Date` on created transactions.
const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Request body of Xero's create bank transactions endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BankTransactions {
    /// Transactions to create.
    #[serde(rename = "BankTransactions")]
    pub bank_transactions: Vec<BankTransaction>,
}

/// A Xero bank transaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BankTransaction {
    /// Always `RECEIVE`.
    #[serde(rename = "Type")]
    pub transaction_type: String,
    /// Counterparty.
    pub contact: Contact,
    /// Receiving bank account.
    pub bank_account: BankAccount,
    /// Line items.
    pub line_items: Vec<LineItem>,
    /// Reference shown on the bank statement line.
    pub reference: String,
    /// ISO 4217 currency code.
    pub currency_code: String,
    /// Transaction date, UTC, second precision.
    pub date: String,
    /// Present and `true` when the transaction is created reconciled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_reconciled: Option<bool>,
}

/// Contact of a [`BankTransaction`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Contact {
    /// Contact name.
    pub name: String,
}

/// Bank account of a [`BankTransaction`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BankAccount {
    /// Xero account id.
    #[serde(rename = "AccountID")]
    pub account_id: String,
}

/// Line item of a [`BankTransaction`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LineItem {
    /// Description.
    pub description: String,
    /// Quantity.
    pub quantity: u32,
    /// Amount in major units.
    pub unit_amount: Decimal,
    /// Revenue account code.
    pub account_code: String,
    /// Tax type, when the wallet maps to one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_type: Option<String>,
}

/// A transaction ready to be pushed, with the amount and currency it carries.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltTransaction {
    /// Request body.
    pub payload: BankTransactions,
    /// Amount in major units, rounded to cents.
    pub amount: Decimal,
    /// Uppercase currency code.
    pub currency: String,
}

/// Why a payment was not pushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The payment does not credit the wallet.
    NotIncoming,
    /// No fiat currency or amount was recorded for the payment.
    MissingFiat,
    /// The wallet has no usable Xero bank account.
    MissingBankAccount,
    /// The fiat amount rounds to zero or less.
    NonPositiveAmount,
    /// The payment was already pushed, or is being pushed.
    AlreadySynced,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            SkipReason::NotIncoming => "payment is not incoming",
            SkipReason::MissingFiat => "missing fiat currency or amount",
            SkipReason::MissingBankAccount => "wallet missing xero_bank_account_id",
            SkipReason::NonPositiveAmount => "fiat amount is not positive",
            SkipReason::AlreadySynced => "already synced",
        };
        f.write_str(reason)
    }
}

/// Build the Xero transaction for a payment, or decide to skip it.
///
/// Pure: the transaction date is taken from `now`.
///
/// # Errors
///
/// Returns the [`SkipReason`] if the payment should not be pushed.
pub fn build_transaction(
    payment: &Payment,
    wallet: &WalletConfig,
    settings: &ExtensionSettings,
    now: DateTime<Utc>,
) -> Result<BuiltTransaction, SkipReason> {
    if !payment.is_incoming() {
        return Err(SkipReason::NotIncoming);
    }
    let (Some(currency), Some(fiat_amount)) = (payment.fiat_currency(), payment.fiat_amount())
    else {
        return Err(SkipReason::MissingFiat);
    };
    let bank_account_id = wallet
        .bank_account_id()
        .ok_or(SkipReason::MissingBankAccount)?;
    let amount = fiat_amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    if amount <= Decimal::ZERO {
        return Err(SkipReason::NonPositiveAmount);
    }

    let description = non_blank(payment.memo.as_deref()).map_or_else(
        || format!("{PLATFORM_NAME} payment {}", payment.payment_hash),
        ToString::to_string,
    );
    let currency = currency.to_uppercase();

    let transaction = BankTransaction {
        transaction_type: "RECEIVE".to_string(),
        contact: Contact {
            name: wallet.contact_name(),
        },
        bank_account: BankAccount {
            account_id: bank_account_id.to_string(),
        },
        line_items: vec![LineItem {
            description: description.clone(),
            quantity: 1,
            unit_amount: amount,
            account_code: wallet.account_code().to_string(),
            tax_type: settings.tax_type(wallet.tax_rate).map(ToString::to_string),
        }],
        reference: description,
        currency_code: currency.clone(),
        date: now.format(DATE_FORMAT).to_string(),
        is_reconciled: wallet.auto_reconcile.then_some(true),
    };

    Ok(BuiltTransaction {
        payload: BankTransactions {
            bank_transactions: vec![transaction],
        },
        amount,
        currency,
    })
}
