//! Connecting a user to a Xero organisation through the OAuth2 authorization
//! code flow.

use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};

use crate::{
    new_id, storage::Storage, xero_client::LedgerClient, ConfigError, XeroConnection, XeroSync,
    XeroSyncError,
};

/// Xero's OAuth2 authorization endpoint.
pub const DEFAULT_AUTHORIZE_URL: &str = "https://login.xero.com/identity/connect/authorize";
/// Scopes requested when connecting. `offline_access` is needed for refresh
/// tokens.
pub const DEFAULT_SCOPES: &str =
    "openid profile email accounting.settings accounting.transactions offline_access";

/// Seconds a user has to get through Xero's consent page.
pub const AUTHORIZATION_TTL_SECS: i64 = 10 * 60;

/// An authorization started by [`XeroSync::begin_authorization`] and not yet
/// completed.
pub(crate) struct PendingAuthorization {
    user_id: String,
    started_at: DateTime<Utc>,
}

impl PendingAuthorization {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.started_at + Duration::seconds(AUTHORIZATION_TTL_SECS) <= now
    }
}

/// URL to send the user to in order to grant access to an organisation. Xero
/// redirects back to `redirect_uri` with `code` and the given `state`.
#[must_use]
pub fn authorize_url(
    base: &str,
    client_id: &str,
    redirect_uri: &str,
    scopes: &str,
    state: &str,
) -> String {
    format!(
        "{base}?response_type=code&client_id={}&redirect_uri={}&scope={}&state={}",
        urlencoding::encode(client_id),
        urlencoding::encode(redirect_uri),
        urlencoding::encode(scopes),
        urlencoding::encode(state),
    )
}

impl<S: Storage + 'static, C: LedgerClient> XeroSync<S, C> {
    /// Start connecting `user_id` to Xero. Returns a random, single use
    /// `state` to pass to [`authorize_url`], which
    /// [`XeroSync::take_authorization`] resolves back to the user.
    pub async fn begin_authorization(&self, user_id: &str) -> String {
        let state = new_id();
        let now = Utc::now();
        let mut pending = self.authorizations.lock().await;
        pending.retain(|_, authorization| !authorization.is_expired(now));
        pending.insert(
            state.clone(),
            PendingAuthorization {
                user_id: user_id.to_string(),
                started_at: now,
            },
        );
        debug!("Started Xero authorization for user {user_id}");
        state
    }

    /// The user an authorization `state` was issued to. A state is accepted
    /// once, and only within [`AUTHORIZATION_TTL_SECS`] of being issued.
    pub async fn take_authorization(&self, state: &str) -> Option<String> {
        let authorization = self.authorizations.lock().await.remove(state)?;
        if authorization.is_expired(Utc::now()) {
            warn!(
                "Xero authorization of user {} expired before it was completed",
                authorization.user_id
            );
            return None;
        }
        Some(authorization.user_id)
    }

    /// Finish connecting `user_id` to Xero after the authorization redirect.
    ///
    /// Exchanges `code` for tokens, scopes the connection to the first
    /// organisation the tokens grant access to, and stores it as the user's
    /// current connection. Blank tax mappings are then filled in from the
    /// organisation's tax rates, on a best-effort basis.
    ///
    /// # Errors
    ///
    /// Returns an error if the user's credentials are missing, Xero rejects the
    /// code, no organisation is authorized, or the connection could not be
    /// stored.
    pub async fn complete_authorization(
        &self,
        user_id: &str,
        code: &str,
        redirect_uri: &str,
    ) -> Result<XeroConnection, XeroSyncError> {
        let settings = self.settings(user_id).await?;
        let credentials = settings.credentials()?;

        let tokens = self
            .client
            .exchange_code(&credentials, code, redirect_uri)
            .await?;
        let tenant_id = self
            .client
            .tenants(&tokens.access_token)
            .await?
            .into_iter()
            .next()
            .ok_or(ConfigError::NoTenant)?
            .tenant_id;

        let now = Utc::now();
        let connection = match self.store.get_connection(user_id).await? {
            Some(mut existing) => {
                existing.tenant_id = tenant_id;
                existing.apply_tokens(tokens, now);
                self.store.update_connection(existing.clone()).await?;
                existing
            }
            None => {
                let connection = XeroConnection::new(user_id, tenant_id, tokens, now);
                self.store.insert_connection(connection.clone()).await?;
                connection
            }
        };
        info!(
            "Xero connection stored for user {user_id}, tenant {}",
            connection.tenant_id
        );

        self.auto_map_tax_rates(user_id, &connection.access_token())
            .await;

        Ok(connection)
    }
}
