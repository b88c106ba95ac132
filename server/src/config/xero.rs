use std::time::Duration;

use hyper::Uri;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr, DurationSeconds};
use xerosync::{
    xero_client::{DEFAULT_API_URL, DEFAULT_CONNECTIONS_URL, DEFAULT_TOKEN_URL},
    DEFAULT_AUTHORIZE_URL, DEFAULT_SCOPES,
};

/// Default OAuth redirect URI, served by this server's `/oauth/callback`.
const DEFAULT_REDIRECT_URI: &str = "http://localhost:8080/oauth/callback";

#[serde_as]
#[derive(Deserialize, PartialEq, Eq, Debug, Serialize, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct XeroConfig {
    /// OAuth2 token endpoint.
    #[serde_as(as = "DisplayFromStr")]
    pub token_url: Uri,
    /// OAuth2 consent page users are redirected to.
    #[serde_as(as = "DisplayFromStr")]
    pub authorize_url: Uri,
    /// Accounting API base.
    #[serde_as(as = "DisplayFromStr")]
    pub api_url: Uri,
    /// Endpoint listing the organisations a token may access.
    #[serde_as(as = "DisplayFromStr")]
    pub connections_url: Uri,
    /// Where Xero sends users back to after consent. Must be registered with
    /// the users' Xero apps.
    #[serde_as(as = "DisplayFromStr")]
    pub redirect_uri: Uri,
    /// Space separated OAuth2 scopes.
    pub scopes: String,
    /// Timeout in seconds for calls to Xero.
    #[serde_as(as = "DurationSeconds")]
    pub timeout: Duration,
    /// Timeout in seconds for connecting to Xero.
    #[serde_as(as = "DurationSeconds")]
    pub connection_timeout: Duration,
}

impl XeroConfig {
    pub(super) fn validate(&self) {
        assert!(
            self.redirect_uri.scheme().is_some() && self.redirect_uri.authority().is_some(),
            "Xero redirect URI must be absolute, got {}",
            self.redirect_uri
        );
        assert!(
            self.scopes.split_whitespace().any(|scope| scope == "offline_access"),
            "Xero scopes must include offline_access, or tokens cannot be refreshed"
        );
        assert!(
            !self.timeout.is_zero() && !self.connection_timeout.is_zero(),
            "Xero timeouts must be greater than zero"
        );
    }
}

impl Default for XeroConfig {
    fn default() -> Self {
        Self {
            token_url: Uri::from_static(DEFAULT_TOKEN_URL),
            authorize_url: Uri::from_static(DEFAULT_AUTHORIZE_URL),
            api_url: Uri::from_static(DEFAULT_API_URL),
            connections_url: Uri::from_static(DEFAULT_CONNECTIONS_URL),
            redirect_uri: Uri::from_static(DEFAULT_REDIRECT_URI),
            scopes: DEFAULT_SCOPES.to_string(),
            timeout: Duration::from_secs(10),
            connection_timeout: Duration::from_secs(5),
        }
    }
}
