use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};

#[serde_as]
#[derive(Deserialize, PartialEq, Eq, Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct SyncConfig {
    /// Seconds after which a reservation that was neither confirmed nor rolled
    /// back is considered orphaned and removed.
    #[serde_as(as = "DurationSeconds")]
    pub reservation_ttl: Duration,
    /// Number of reported payments that may wait for the listener.
    pub event_queue_size: usize,
}

impl SyncConfig {
    pub(super) fn validate(&self, xero_timeout: Duration) {
        assert!(
            self.reservation_ttl > xero_timeout,
            "reservation TTL ({}s) must be longer than the Xero timeout ({}s)",
            self.reservation_ttl.as_secs(),
            xero_timeout.as_secs()
        );
        assert!(self.event_queue_size > 0, "event queue size must be positive");
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            reservation_ttl: Duration::from_secs(15 * 60),
            event_queue_size: 1_000,
        }
    }
}
