use std::{ops::Deref, time::Duration};

use httpmock::{
    Method::{GET, POST},
    Mock, MockServer,
};
use serde_json::{json, Value};
use xerosync::{storage::Storage, XeroSync};

pub const TENANT_ID: &str = "0c5b7a41-3c62-4c1e-9d59-6bb1d3f2e7a0";

pub const TOKEN_PATH: &str = "/connect/token";
pub const CONNECTIONS_PATH: &str = "/connections";
pub const API_PATH: &str = "/api.xro/2.0";

/// A local stand-in for the Xero identity and accounting APIs.
pub struct MockXero {
    server: MockServer,
}

impl Deref for MockXero {
    type Target = MockServer;

    fn deref(&self) -> &MockServer {
        &self.server
    }
}

impl MockXero {
    pub async fn start() -> MockXero {
        MockXero {
            server: MockServer::start_async().await,
        }
    }

    #[must_use]
    pub fn token_url(&self) -> String {
        self.url(TOKEN_PATH)
    }

    #[must_use]
    pub fn api_url(&self) -> String {
        self.url(API_PATH)
    }

    #[must_use]
    pub fn connections_url(&self) -> String {
        self.url(CONNECTIONS_PATH)
    }

    /// A `XeroSync` talking to this mock.
    pub fn xero_sync<S: Storage + 'static>(&self, store: S) -> XeroSync<S> {
        XeroSync::builder(store)
            .token_url(&self.token_url())
            .api_url(&self.api_url())
            .connections_url(&self.connections_url())
            .timeout(Duration::from_secs(5))
            .build()
            .expect("failed to build XeroSync for mock Xero")
    }

    /// Token endpoint answering `grant_type` requests with a new token set.
    pub fn mock_token(&self, grant_type: &str, access_token: &str, expires_in: i64) -> Mock {
        self.mock(|when, then| {
            when.method(POST)
                .path(TOKEN_PATH)
                .header("content-type", "application/x-www-form-urlencoded")
                .body_contains(format!("grant_type={grant_type}"));
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "access_token": access_token,
                    "refresh_token": format!("{access_token}-refresh"),
                    "expires_in": expires_in,
                    "token_type": "Bearer",
                    "scope": "accounting.transactions offline_access",
                }));
        })
    }

    pub fn mock_token_failure(&self, status: u16) -> Mock {
        self.mock(|when, then| {
            when.method(POST).path(TOKEN_PATH);
            then.status(status)
                .header("content-type", "application/json")
                .json_body(json!({ "error": "invalid_grant" }));
        })
    }

    pub fn mock_connections(&self, tenant_ids: &[&str]) -> Mock {
        let tenants: Vec<Value> = tenant_ids
            .iter()
            .map(|tenant_id| {
                json!({
                    "id": format!("connection-{tenant_id}"),
                    "tenantId": tenant_id,
                    "tenantType": "ORGANISATION",
                    "tenantName": "Demo Company",
                })
            })
            .collect();
        self.mock(|when, then| {
            when.method(GET).path(CONNECTIONS_PATH);
            then.status(200)
                .header("content-type", "application/json")
                .json_body(Value::Array(tenants));
        })
    }

    pub fn mock_accounts(&self, accounts: Value) -> Mock {
        self.mock(|when, then| {
            when.method(GET)
                .path(format!("{API_PATH}/Accounts"))
                .header("xero-tenant-id", TENANT_ID);
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({ "Accounts": accounts }));
        })
    }

    pub fn mock_tax_rates(&self, tax_rates: Value) -> Mock {
        self.mock(|when, then| {
            when.method(GET)
                .path(format!("{API_PATH}/TaxRates"))
                .header("xero-tenant-id", TENANT_ID);
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({ "TaxRates": tax_rates }));
        })
    }

    /// Bank transaction creation succeeding for any request.
    pub fn mock_bank_transactions(&self, bank_transaction_id: &str) -> Mock {
        self.mock_bank_transaction_containing("", bank_transaction_id)
    }

    /// Bank transaction creation succeeding for requests whose body contains
    /// `needle`, such as a payment hash.
    pub fn mock_bank_transaction_containing(&self, needle: &str, bank_transaction_id: &str) -> Mock {
        self.mock(|when, then| {
            when.method(POST)
                .path(format!("{API_PATH}/BankTransactions"))
                .header("xero-tenant-id", TENANT_ID)
                .body_contains(needle);
            then.status(200)
                .header("content-type", "application/json")
                .delay(Duration::from_millis(100))
                .json_body(json!({
                    "Status": "OK",
                    "BankTransactions": [{
                        "BankTransactionID": bank_transaction_id,
                        "Type": "RECEIVE",
                        "Status": "AUTHORISED",
                    }],
                }));
        })
    }

    /// Bank transaction creation failing with `status` for requests whose body
    /// contains `needle`.
    pub fn mock_bank_transaction_failure(&self, needle: &str, status: u16) -> Mock {
        self.mock(|when, then| {
            when.method(POST)
                .path(format!("{API_PATH}/BankTransactions"))
                .body_contains(needle);
            then.status(status)
                .header("content-type", "application/json")
                .json_body(json!({
                    "ErrorNumber": 10,
                    "Type": "ValidationException",
                    "Message": "A validation exception occurred",
                }));
        })
    }
}
