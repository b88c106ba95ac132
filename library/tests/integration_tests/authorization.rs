use serde_json::json;
use testing_utils::{connection, init_logger, pushing_wallet, MockXero, TENANT_ID, USER_ID};
use xerosync::{
    storage::{stores::InMemory, SettingsStorage},
    ConfigError, XeroSyncError,
};

use crate::seeded;

const REDIRECT_URI: &str = "https://pay.example/xero_sync/oauth/callback";

fn tax_rates() -> serde_json::Value {
    json!([
        {
            "Name": "GST on Income",
            "TaxType": "OUTPUT2",
            "Status": "ACTIVE",
            "EffectiveRate": 15.0,
            "DisplayTaxRate": 15.0,
            "CanApplyToRevenue": true,
        },
        {
            "Name": "GST on Expenses",
            "TaxType": "INPUT2",
            "Status": "ACTIVE",
            "EffectiveRate": 15.0,
            "CanApplyToRevenue": false,
        },
        {
            "Name": "Tax Exempt",
            "TaxType": "EXEMPTOUTPUT",
            "Status": "ACTIVE",
            "EffectiveRate": 0.0,
            "CanApplyToRevenue": true,
        },
    ])
}

#[tokio::test]
async fn new_connection_maps_tax_rates() {
    init_logger();
    let mock_xero = MockXero::start().await;
    let exchange = mock_xero.mock_token("authorization_code", "fresh-access-token", 1800);
    mock_xero.mock_connections(&[TENANT_ID, "second-tenant"]);
    let tax_rates = mock_xero.mock_tax_rates(tax_rates());
    let xero_sync = mock_xero.xero_sync(seeded(InMemory::new(), None, pushing_wallet()));

    let connection = xero_sync
        .complete_authorization(USER_ID, "auth-code", REDIRECT_URI)
        .await
        .unwrap();
    assert_eq!(connection.tenant_id, TENANT_ID);
    assert_eq!(connection.access_token, "fresh-access-token");
    exchange.assert_hits_async(1).await;
    tax_rates.assert_hits_async(1).await;

    assert_eq!(xero_sync.connection(USER_ID).await.unwrap(), Some(connection));
    let settings = xero_sync.settings(USER_ID).await.unwrap();
    assert_eq!(settings.xero_tax_standard.as_deref(), Some("OUTPUT2"));
    assert_eq!(settings.xero_tax_zero, None);
    assert_eq!(settings.xero_tax_exempt.as_deref(), Some("EXEMPTOUTPUT"));
}

#[tokio::test]
async fn reconnecting_replaces_tokens_and_keeps_manual_mappings() {
    init_logger();
    let mock_xero = MockXero::start().await;
    mock_xero.mock_token("authorization_code", "fresh-access-token", 1800);
    mock_xero.mock_connections(&[TENANT_ID]);
    mock_xero.mock_tax_rates(tax_rates());
    let mut store = seeded(InMemory::new(), Some(connection(10)), pushing_wallet());
    let mut settings = testing_utils::settings();
    settings.xero_tax_standard = Some("MANUAL".to_string());
    SettingsStorage::upsert(&mut store, settings).unwrap();
    let xero_sync = mock_xero.xero_sync(store);
    let old = xero_sync.connection(USER_ID).await.unwrap().unwrap();

    let connection = xero_sync
        .complete_authorization(USER_ID, "auth-code", REDIRECT_URI)
        .await
        .unwrap();
    assert_eq!(connection.id, old.id);
    assert_eq!(connection.refresh_token, "fresh-access-token-refresh");
    assert!(connection.expires_at > old.expires_at);

    let settings = xero_sync.settings(USER_ID).await.unwrap();
    assert_eq!(settings.xero_tax_standard.as_deref(), Some("MANUAL"));
    assert_eq!(settings.xero_tax_exempt.as_deref(), Some("EXEMPTOUTPUT"));
}

#[tokio::test]
async fn tax_rate_failure_does_not_fail_connection() {
    init_logger();
    let mock_xero = MockXero::start().await;
    mock_xero.mock_token("authorization_code", "fresh-access-token", 1800);
    mock_xero.mock_connections(&[TENANT_ID]);
    // No tax rate mock: Xero answers 404.
    let xero_sync = mock_xero.xero_sync(seeded(InMemory::new(), None, pushing_wallet()));

    xero_sync
        .complete_authorization(USER_ID, "auth-code", REDIRECT_URI)
        .await
        .unwrap();
    assert!(xero_sync.connection(USER_ID).await.unwrap().is_some());
    let settings = xero_sync.settings(USER_ID).await.unwrap();
    assert_eq!(settings.xero_tax_standard, None);
}

#[tokio::test]
async fn no_organisation() {
    init_logger();
    let mock_xero = MockXero::start().await;
    mock_xero.mock_token("authorization_code", "fresh-access-token", 1800);
    mock_xero.mock_connections(&[]);
    let xero_sync = mock_xero.xero_sync(seeded(InMemory::new(), None, pushing_wallet()));

    let result = xero_sync
        .complete_authorization(USER_ID, "auth-code", REDIRECT_URI)
        .await;
    assert!(matches!(
        result,
        Err(XeroSyncError::Config(ConfigError::NoTenant))
    ));
    assert!(xero_sync.connection(USER_ID).await.unwrap().is_none());
}

#[tokio::test]
async fn rejected_code() {
    init_logger();
    let mock_xero = MockXero::start().await;
    mock_xero.mock_token_failure(400);
    let xero_sync = mock_xero.xero_sync(seeded(InMemory::new(), None, pushing_wallet()));

    let result = xero_sync
        .complete_authorization(USER_ID, "bad-code", REDIRECT_URI)
        .await;
    assert!(matches!(result, Err(XeroSyncError::Xero(_))));
    assert!(xero_sync.connection(USER_ID).await.unwrap().is_none());
}
