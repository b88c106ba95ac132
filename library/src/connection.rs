use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::new_id;

/// A user's OAuth2 connection to one Xero organisation.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XeroConnection {
    /// Identity of this record.
    pub id: String,
    /// Owning user.
    pub user_id: String,
    /// Xero organisation all API calls are scoped to.
    pub tenant_id: String,
    /// Current bearer token.
    pub access_token: String,
    /// Token used to obtain the next access token.
    pub refresh_token: String,
    /// Expiry of `access_token`.
    pub expires_at: DateTime<Utc>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time. The most recently updated connection of a user
    /// is their current one.
    pub updated_at: DateTime<Utc>,
}

impl XeroConnection {
    /// Create a connection from a freshly issued token set.
    pub fn new(
        user_id: impl Into<String>,
        tenant_id: impl Into<String>,
        tokens: TokenSet,
        now: DateTime<Utc>,
    ) -> Self {
        XeroConnection {
            id: new_id(),
            user_id: user_id.into(),
            tenant_id: tenant_id.into(),
            expires_at: tokens.expires_at(now),
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the tokens with a freshly issued set.
    pub fn apply_tokens(&mut self, tokens: TokenSet, now: DateTime<Utc>) {
        self.expires_at = tokens.expires_at(now);
        self.access_token = tokens.access_token;
        self.refresh_token = tokens.refresh_token;
        self.updated_at = now;
    }

    /// The bearer token and tenant to use for API calls.
    #[must_use]
    pub fn access_token(&self) -> AccessToken {
        AccessToken {
            token: self.access_token.clone(),
            tenant_id: self.tenant_id.clone(),
        }
    }
}

impl fmt::Debug for XeroConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XeroConnection")
            .field("id", &self.id)
            .field("user_id", &self.user_id)
            .field("tenant_id", &self.tenant_id)
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Tokens issued by the Xero identity endpoint.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct TokenSet {
    /// Bearer token.
    pub access_token: String,
    /// Refresh token.
    pub refresh_token: String,
    /// Lifetime of the bearer token in seconds.
    pub expires_in: i64,
}

impl TokenSet {
    /// Absolute expiry of the bearer token, counted from `now`.
    #[must_use]
    pub fn expires_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::seconds(self.expires_in)
    }
}

impl fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSet")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// A valid bearer token together with the tenant it is scoped to.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    /// Bearer token.
    pub token: String,
    /// Xero organisation id, sent as the `xero-tenant-id` header.
    pub tenant_id: String,
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"[REDACTED]")
            .field("tenant_id", &self.tenant_id)
            .finish()
    }
}
