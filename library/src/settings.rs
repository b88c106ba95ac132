use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{wallet::non_blank, ConfigError, TaxRateCategory};

/// Per-user Xero app credentials and tax code mappings.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionSettings {
    /// Owning user.
    pub user_id: String,
    /// Xero app client id.
    #[serde(default)]
    pub xero_client_id: Option<String>,
    /// Xero app client secret.
    #[serde(default)]
    pub xero_client_secret: Option<String>,
    /// Tax type used for [`TaxRateCategory::Standard`].
    #[serde(default)]
    pub xero_tax_standard: Option<String>,
    /// Tax type used for [`TaxRateCategory::Zero`].
    #[serde(default)]
    pub xero_tax_zero: Option<String>,
    /// Tax type used for [`TaxRateCategory::Exempt`].
    #[serde(default)]
    pub xero_tax_exempt: Option<String>,
    /// Last modification time.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ExtensionSettings {
    /// Empty settings for the given user.
    pub fn new(user_id: impl Into<String>) -> Self {
        ExtensionSettings {
            user_id: user_id.into(),
            ..ExtensionSettings::default()
        }
    }

    /// The Xero app credentials.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingCredentials`] if either the client id or
    /// the client secret is blank.
    pub fn credentials(&self) -> Result<ClientCredentials, ConfigError> {
        match (
            non_blank(self.xero_client_id.as_deref()),
            non_blank(self.xero_client_secret.as_deref()),
        ) {
            (Some(client_id), Some(client_secret)) => Ok(ClientCredentials {
                client_id: client_id.to_string(),
                client_secret: client_secret.to_string(),
            }),
            _ => Err(ConfigError::MissingCredentials(self.user_id.clone())),
        }
    }

    /// Tax type mapped to the given category, if one is configured.
    #[must_use]
    pub fn tax_type(&self, category: TaxRateCategory) -> Option<&str> {
        let tax_type = match category {
            TaxRateCategory::Standard => self.xero_tax_standard.as_deref(),
            TaxRateCategory::Zero => self.xero_tax_zero.as_deref(),
            TaxRateCategory::Exempt => self.xero_tax_exempt.as_deref(),
            TaxRateCategory::None => None,
        };
        non_blank(tax_type)
    }
}

impl fmt::Debug for ExtensionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionSettings")
            .field("user_id", &self.user_id)
            .field("xero_client_id", &self.xero_client_id)
            .field(
                "xero_client_secret",
                &self.xero_client_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("xero_tax_standard", &self.xero_tax_standard)
            .field("xero_tax_zero", &self.xero_tax_zero)
            .field("xero_tax_exempt", &self.xero_tax_exempt)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// OAuth2 client credentials of a user's Xero app.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    /// Client id.
    pub client_id: String,
    /// Client secret.
    pub client_secret: String,
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}
