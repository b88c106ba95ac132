use std::fmt;

use chrono::Utc;
use log::{error, info, warn};

use crate::{
    storage::Storage, xero_client::LedgerClient, ConfigError, PushOutcome, WalletConfig, XeroSync,
    XeroSyncError,
};

/// Counts of one batch run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Payments Xero accepted.
    pub pushed: usize,
    /// Payments not sent, including those already synced.
    pub skipped: usize,
    /// Payments Xero rejected or that could not be sent.
    pub failed: usize,
    /// One message per failed payment.
    pub errors: Vec<String>,
}

impl fmt::Display for ReconcileSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Pushed {} payment(s); skipped {}; failed {}.",
            self.pushed, self.skipped, self.failed
        )?;
        if !self.errors.is_empty() {
            write!(f, " Errors: {}", self.errors.join(", "))?;
        }
        Ok(())
    }
}

impl<S: Storage + 'static, C: LedgerClient> XeroSync<S, C> {
    /// Push every completed incoming payment of a wallet configuration's
    /// wallet, oldest first. See [`XeroSync::reconcile`].
    ///
    /// # Errors
    ///
    /// Returns [`XeroSyncError::WalletNotFound`] if there is no configuration
    /// with this id, and otherwise the errors of [`XeroSync::reconcile`].
    pub async fn reconcile_wallet(&self, config_id: &str) -> Result<ReconcileSummary, XeroSyncError> {
        let mut wallet = self
            .store
            .get_wallet(config_id)
            .await?
            .ok_or_else(|| XeroSyncError::WalletNotFound(config_id.to_string()))?;
        self.reconcile(&mut wallet).await
    }

    /// Push every completed incoming payment of `wallet`, oldest first.
    ///
    /// A payment that fails does not stop the batch; it is counted and its
    /// error recorded in the summary. Afterwards the wallet's `last_synced`
    /// and `status` are updated, both in place and in storage. Storage is
    /// only touched in those two fields, and failing to store them is logged
    /// rather than returned, since the payments have been pushed by then.
    ///
    /// # Errors
    ///
    /// Returns an error without pushing anything if the user has no Xero
    /// connection, no valid token can be obtained, or storage fails.
    pub async fn reconcile(
        &self,
        wallet: &mut WalletConfig,
    ) -> Result<ReconcileSummary, XeroSyncError> {
        let mut connection = self
            .store
            .get_connection(&wallet.user_id)
            .await?
            .ok_or_else(|| ConfigError::MissingConnection(wallet.user_id.clone()))?;
        let settings = self.settings(&wallet.user_id).await?;
        let token = self.ensure_access_token(&mut connection, &settings).await?;

        let mut payments = self.store.completed_incoming(&wallet.wallet).await?;
        payments.sort_by(|a, b| {
            a.time
                .cmp(&b.time)
                .then_with(|| a.payment_hash.cmp(&b.payment_hash))
        });

        self.sweep_stale_reservations().await?;
        let mut known_synced = self.store.synced_hashes(&wallet.wallet).await?;

        let mut summary = ReconcileSummary::default();
        for payment in &payments {
            let outcome = self
                .push_payment(payment, wallet, &settings, &token, Some(&mut known_synced))
                .await;
            match outcome {
                Ok(PushOutcome::Pushed { .. }) => summary.pushed += 1,
                Ok(PushOutcome::Skipped { .. }) => summary.skipped += 1,
                Ok(PushOutcome::Rejected { status, .. }) => {
                    summary.failed += 1;
                    summary
                        .errors
                        .push(format!("{}: HTTP {}", payment.payment_hash, status.as_u16()));
                }
                Err(e) => {
                    warn!("Failed to push payment {}: {e}", payment.payment_hash);
                    summary.failed += 1;
                    summary.errors.push(format!("{}: {e}", payment.payment_hash));
                }
            }
        }

        let synced_at = Utc::now();
        let status = summary.to_string();
        wallet.last_synced = Some(synced_at);
        wallet.status = Some(status.clone());
        // Only the sync columns are written, so edits made while the batch ran
        // are kept.
        match self
            .store
            .set_wallet_sync_status(&wallet.id, synced_at, status)
            .await
        {
            Ok(Some(_)) => {}
            Ok(None) => warn!(
                "Wallet configuration {} was removed before its batch finished",
                wallet.id
            ),
            Err(e) => error!(
                "Failed to store sync status of wallet configuration {}: {e}",
                wallet.id
            ),
        }
        info!("Reconciled wallet configuration {}: {summary}", wallet.id);

        Ok(summary)
    }
}
