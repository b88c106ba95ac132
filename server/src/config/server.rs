use std::net::{Ipv4Addr, Ipv6Addr};

use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};

// Http server configuration.
#[derive(Deserialize, Debug, Serialize, Clone)]
pub struct ServerConfig {
    /// Port to listen on.
    pub port: u16,
    /// IPv4 to listen on.
    pub ipv4: Ipv4Addr,
    /// IPv6 to listen on.
    pub ipv6: Option<Ipv6Addr>,
    /// Bearer auth token to require on the API. The OAuth endpoints are
    /// visited by browsers and never require it.
    ///
    /// It is recommended that secrets like this be set via the `API_TOKEN`
    /// environment variable.
    #[serde(skip_serializing)]
    pub token: Option<Secret<String>>,
}

impl ServerConfig {
    pub(super) fn validate(&self) {
        if let Some(token) = &self.token {
            assert!(
                !token.expose_secret().trim().is_empty(),
                "API token is set but empty. Unset API_TOKEN to disable bearer auth."
            );
        }
    }
}

impl PartialEq for ServerConfig {
    fn eq(&self, other: &Self) -> bool {
        let ports_match = self.port == other.port;
        let ipv4s_match = self.ipv4 == other.ipv4;
        let ipv6s_match = self.ipv6 == other.ipv6;
        let tokens_match = self.token.as_ref().map(ExposeSecret::expose_secret)
            == other.token.as_ref().map(ExposeSecret::expose_secret);

        ports_match && ipv4s_match && ipv6s_match && tokens_match
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            ipv4: Ipv4Addr::LOCALHOST,
            ipv6: Some(Ipv6Addr::LOCALHOST),
            token: None,
        }
    }
}
