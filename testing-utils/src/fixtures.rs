use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Map};
use xerosync::{
    ExtensionSettings, Payment, PaymentStatus, TokenSet, WalletConfig, XeroConnection,
    FIAT_AMOUNT_KEY, FIAT_CURRENCY_KEY,
};

use crate::TENANT_ID;

pub const USER_ID: &str = "user-1";
pub const WALLET_ID: &str = "wallet-1";
pub const WALLET_CONFIG_ID: &str = "wallet-config-1";
pub const BANK_ACCOUNT_ID: &str = "8f3c1a52-7d6e-4b10-9a4f-2c5e8d7b6a31";

/// A settled incoming payment to [`WALLET_ID`] worth `fiat_amount` USD.
#[must_use]
pub fn payment(payment_hash: &str, fiat_amount: &str, time: DateTime<Utc>) -> Payment {
    let mut extra = Map::new();
    extra.insert(FIAT_CURRENCY_KEY.to_string(), json!("USD"));
    extra.insert(FIAT_AMOUNT_KEY.to_string(), json!(fiat_amount));
    Payment {
        payment_hash: payment_hash.to_string(),
        wallet_id: WALLET_ID.to_string(),
        amount_msat: 21_000_000,
        status: PaymentStatus::Success,
        memo: Some(format!("invoice {payment_hash}")),
        time,
        extra,
    }
}

/// A configuration pushing [`WALLET_ID`] into [`BANK_ACCOUNT_ID`].
#[must_use]
pub fn pushing_wallet() -> WalletConfig {
    let mut wallet = WalletConfig::new(WALLET_CONFIG_ID, USER_ID, WALLET_ID);
    wallet.push_payments = true;
    wallet.xero_bank_account_id = Some(BANK_ACCOUNT_ID.to_string());
    wallet
}

/// Settings with client credentials and no tax mappings.
#[must_use]
pub fn settings() -> ExtensionSettings {
    let mut settings = ExtensionSettings::new(USER_ID);
    settings.xero_client_id = Some("client-id".to_string());
    settings.xero_client_secret = Some("client-secret".to_string());
    settings
}

/// A connection to [`TENANT_ID`] whose token expires in `expires_in` seconds.
#[must_use]
pub fn connection(expires_in: i64) -> XeroConnection {
    XeroConnection::new(
        USER_ID,
        TENANT_ID,
        TokenSet {
            access_token: "stored-access-token".to_string(),
            refresh_token: "stored-refresh-token".to_string(),
            expires_in,
        },
        Utc::now(),
    )
}

/// A connection whose token expired an hour ago.
#[must_use]
pub fn expired_connection() -> XeroConnection {
    let mut connection = connection(0);
    connection.expires_at = Utc::now() - Duration::hours(1);
    connection
}
