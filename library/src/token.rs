use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use log::debug;
use tokio::sync::Mutex;

use crate::{
    storage::Storage, xero_client::LedgerClient, AccessToken, ExtensionSettings, XeroConnection,
    XeroSync, XeroSyncError,
};

/// Tokens expiring within this many seconds are refreshed before use, leaving
/// room for clock skew and request latency.
pub const REFRESH_MARGIN_SECS: i64 = 120;

/// Whether a token expiring at `expires_at` must be refreshed at `now`.
#[must_use]
pub fn needs_refresh(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    expires_at <= now + Duration::seconds(REFRESH_MARGIN_SECS)
}

impl<S: Storage + 'static, C: LedgerClient> XeroSync<S, C> {
    /// Return a valid access token for `connection`. If the current token is
    /// about to expire it is refreshed, and the connection is updated both in
    /// place and in storage.
    ///
    /// Refreshes of one user's token never overlap. A caller that waited for
    /// another refresh picks up the stored result instead of refreshing again.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingCredentials`](crate::ConfigError) if the
    /// settings lack client credentials, an error if the refresh is rejected or
    /// fails, and an error if the refreshed connection could not be stored.
    pub async fn ensure_access_token(
        &self,
        connection: &mut XeroConnection,
        settings: &ExtensionSettings,
    ) -> Result<AccessToken, XeroSyncError> {
        let credentials = settings.credentials()?;

        let now = Utc::now();
        if !needs_refresh(connection.expires_at, now) {
            return Ok(connection.access_token());
        }

        let lock = self.token_lock(&connection.user_id).await;
        let _guard = lock.lock().await;
        // Xero rotates refresh tokens, so only the stored one is usable.
        if let Some(stored) = self.store.get_connection(&connection.user_id).await? {
            *connection = stored;
        }
        if !needs_refresh(connection.expires_at, Utc::now()) {
            return Ok(connection.access_token());
        }

        debug!(
            "Refreshing Xero token of user {} (expires {})",
            connection.user_id, connection.expires_at
        );
        let tokens = self
            .client
            .refresh_token(&credentials, &connection.refresh_token)
            .await?;
        connection.apply_tokens(tokens, Utc::now());
        self.store.update_connection(connection.clone()).await?;

        Ok(connection.access_token())
    }

    async fn token_lock(&self, user_id: &str) -> Arc<Mutex<()>> {
        self.token_locks
            .lock()
            .await
            .entry(user_id.to_string())
            .or_default()
            .clone()
    }
}
