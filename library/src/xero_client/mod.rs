//! HTTP client for the Xero identity and accounting APIs.

mod types;

use std::{future::Future, time::Duration};

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    http::{uri::InvalidUri, StatusCode},
    Method, Request, Uri,
};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client as HttpClient},
    rt::TokioExecutor,
};
use log::trace;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::time::{error::Elapsed, timeout};
pub use types::{Account, AccountOption, ApiResponse, Tenant, TaxRate};
use types::{AccountsResponse, TaxRatesResponse};

use crate::{transaction::BankTransactions, AccessToken, ClientCredentials, TokenSet};

/// Xero identity token endpoint.
pub const DEFAULT_TOKEN_URL: &str = "https://identity.xero.com/connect/token";
/// Xero accounting API base.
pub const DEFAULT_API_URL: &str = "https://api.xero.com/api.xro/2.0";
/// Xero endpoint listing the organisations a token may access.
pub const DEFAULT_CONNECTIONS_URL: &str = "https://api.xero.com/connections";
/// Header scoping a request to one organisation.
pub const TENANT_HEADER: &str = "xero-tenant-id";

/// Operations this library needs from the remote ledger.
///
/// Implemented by [`XeroClient`]; other implementations can be supplied through
/// [`XeroSyncBuilder::build_with_client`](crate::XeroSyncBuilder::build_with_client).
pub trait LedgerClient: Clone + Send + Sync + 'static {
    /// Exchange an OAuth2 authorization code for tokens.
    fn exchange_code(
        &self,
        credentials: &ClientCredentials,
        code: &str,
        redirect_uri: &str,
    ) -> impl Future<Output = Result<TokenSet, XeroError>> + Send;

    /// Exchange a refresh token for new tokens.
    fn refresh_token(
        &self,
        credentials: &ClientCredentials,
        refresh_token: &str,
    ) -> impl Future<Output = Result<TokenSet, XeroError>> + Send;

    /// Organisations the access token may act on.
    fn tenants(
        &self,
        access_token: &str,
    ) -> impl Future<Output = Result<Vec<Tenant>, XeroError>> + Send;

    /// The organisation's chart of accounts.
    fn accounts(
        &self,
        token: &AccessToken,
    ) -> impl Future<Output = Result<Vec<Account>, XeroError>> + Send;

    /// The organisation's tax rate catalog.
    fn tax_rates(
        &self,
        token: &AccessToken,
    ) -> impl Future<Output = Result<Vec<TaxRate>, XeroError>> + Send;

    /// Create bank transactions. Any HTTP response, successful or not, is
    /// returned as `Ok`; only a failure to obtain a response is an error.
    fn create_bank_transactions(
        &self,
        token: &AccessToken,
        payload: &BankTransactions,
    ) -> impl Future<Output = Result<ApiResponse, XeroError>> + Send;
}

/// Endpoints used by [`XeroClient`].
#[derive(Debug, Clone)]
pub struct XeroEndpoints {
    /// OAuth2 token endpoint.
    pub token_url: Uri,
    /// Accounting API base.
    pub api_url: Uri,
    /// Connections (tenants) endpoint.
    pub connections_url: Uri,
}

impl XeroEndpoints {
    /// Endpoints from their string forms.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the URLs is not a valid URI.
    pub fn new(token_url: &str, api_url: &str, connections_url: &str) -> Result<Self, XeroError> {
        Ok(XeroEndpoints {
            token_url: token_url.parse()?,
            api_url: api_url.parse()?,
            connections_url: connections_url.parse()?,
        })
    }
}

impl Default for XeroEndpoints {
    fn default() -> Self {
        XeroEndpoints {
            token_url: Uri::from_static(DEFAULT_TOKEN_URL),
            api_url: Uri::from_static(DEFAULT_API_URL),
            connections_url: Uri::from_static(DEFAULT_CONNECTIONS_URL),
        }
    }
}

/// A Xero API client.
#[derive(Debug, Clone)]
pub struct XeroClient {
    client: HttpClient<HttpsConnector<HttpConnector>, Full<Bytes>>,
    endpoints: XeroEndpoints,
    timeout: Duration,
}

impl XeroClient {
    /// Returns a client for the given endpoints. `total_timeout` bounds every
    /// request from connection to the last byte of the response.
    #[must_use]
    pub fn new(
        endpoints: XeroEndpoints,
        total_timeout: Duration,
        connection_timeout: Duration,
    ) -> XeroClient {
        let mut hyper_connector = HttpConnector::new();
        hyper_connector.set_connect_timeout(Some(connection_timeout));
        hyper_connector.enforce_http(false);
        hyper_connector.set_keepalive(Some(Duration::from_secs(25)));
        let rustls_connector = HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .enable_http2()
            .wrap_connector(hyper_connector);
        let client = HttpClient::builder(TokioExecutor::new()).build(rustls_connector);

        XeroClient {
            client,
            endpoints,
            timeout: total_timeout,
        }
    }

    async fn send(&self, request: Request<Full<Bytes>>) -> Result<ApiResponse, XeroError> {
        trace!("Sending {} request to {}", request.method(), request.uri());
        timeout(self.timeout, async {
            let response = self
                .client
                .request(request)
                .await
                .map_err(|e| XeroError::Request(Box::new(e)))?;
            let status = response.status();
            let body = response
                .into_body()
                .collect()
                .await
                .map_err(|e| XeroError::Request(Box::new(e)))?
                .to_bytes();
            Ok::<_, XeroError>(ApiResponse { status, body })
        })
        .await?
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenSet, XeroError> {
        let request = Request::builder()
            .method(Method::POST)
            .uri(self.endpoints.token_url.clone())
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Full::new(encode_form(form).into()))?;
        self.send(request).await?.error_for_status()?.json()
    }

    async fn api_get<T: DeserializeOwned>(
        &self,
        token: &AccessToken,
        endpoint: &str,
    ) -> Result<T, XeroError> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(self.api_url(endpoint))
            .header(AUTHORIZATION, format!("Bearer {}", token.token))
            .header(TENANT_HEADER, token.tenant_id.as_str())
            .header(ACCEPT, "application/json")
            .body(Full::new(Bytes::new()))?;
        self.send(request).await?.error_for_status()?.json()
    }

    fn api_url(&self, endpoint: &str) -> String {
        format!(
            "{}/{endpoint}",
            self.endpoints.api_url.to_string().trim_end_matches('/')
        )
    }
}

impl LedgerClient for XeroClient {
    async fn exchange_code(
        &self,
        credentials: &ClientCredentials,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenSet, XeroError> {
        self.token_request(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("client_id", &credentials.client_id),
            ("client_secret", &credentials.client_secret),
        ])
        .await
    }

    async fn refresh_token(
        &self,
        credentials: &ClientCredentials,
        refresh_token: &str,
    ) -> Result<TokenSet, XeroError> {
        self.token_request(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", &credentials.client_id),
            ("client_secret", &credentials.client_secret),
        ])
        .await
    }

    async fn tenants(&self, access_token: &str) -> Result<Vec<Tenant>, XeroError> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(self.endpoints.connections_url.clone())
            .header(AUTHORIZATION, format!("Bearer {access_token}"))
            .header(ACCEPT, "application/json")
            .body(Full::new(Bytes::new()))?;
        self.send(request).await?.error_for_status()?.json()
    }

    async fn accounts(&self, token: &AccessToken) -> Result<Vec<Account>, XeroError> {
        let response: AccountsResponse = self.api_get(token, "Accounts").await?;
        Ok(response.accounts)
    }

    async fn tax_rates(&self, token: &AccessToken) -> Result<Vec<TaxRate>, XeroError> {
        let response: TaxRatesResponse = self.api_get(token, "TaxRates").await?;
        Ok(response.tax_rates)
    }

    async fn create_bank_transactions(
        &self,
        token: &AccessToken,
        payload: &BankTransactions,
    ) -> Result<ApiResponse, XeroError> {
        let request = Request::builder()
            .method(Method::POST)
            .uri(self.api_url("BankTransactions"))
            .header(AUTHORIZATION, format!("Bearer {}", token.token))
            .header(TENANT_HEADER, token.tenant_id.as_str())
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .body(Full::new(serde_json::to_vec(payload)?.into()))?;
        self.send(request).await
    }
}

fn encode_form(pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                urlencoding::encode(key),
                urlencoding::encode(value)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// An error originating from a Xero API call.
#[derive(Error, Debug)]
pub enum XeroError {
    /// The request could not be sent or its response could not be read.
    #[error("request error: {0}")]
    Request(Box<dyn std::error::Error + Send + Sync>),
    /// The request could not be built.
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] hyper::http::Error),
    /// An endpoint is not a valid URI.
    #[error("invalid URI: {0}")]
    InvalidUri(#[from] InvalidUri),
    /// No complete response within the configured timeout.
    #[error("request timed out: {0}")]
    Timeout(#[from] Elapsed),
    /// Xero answered with a non-success status.
    #[error("Xero returned HTTP {status}: {body}")]
    Status {
        /// Response status.
        status: StatusCode,
        /// Response body, lossily decoded.
        body: String,
    },
    /// Failed to (de)serialize JSON.
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

impl XeroError {
    /// Whether the request failed before any response was received.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, XeroError::Request(_) | XeroError::Timeout(_))
    }
}
