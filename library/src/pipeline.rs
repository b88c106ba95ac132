use std::collections::HashSet;

use chrono::Utc;
use hyper::http::StatusCode;
use log::{debug, error, warn};
use rust_decimal::Decimal;

use crate::{
    build_transaction, storage::Storage, xero_client::LedgerClient, AccessToken, Confirmation,
    ExtensionSettings, Payment, Reservation, SkipReason, SyncedPayment, WalletConfig, XeroSync,
    XeroSyncError,
};

/// Result of pushing one payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// Xero created the transaction.
    Pushed {
        /// Payment hash.
        payment_hash: String,
        /// Xero `BankTransactionID`, if it could be read from the response.
        bank_transaction_id: Option<String>,
        /// Amount pushed, in major units.
        amount: Decimal,
        /// Currency pushed.
        currency: String,
    },
    /// Nothing was sent to Xero.
    Skipped {
        /// Payment hash.
        payment_hash: String,
        /// Why.
        reason: SkipReason,
    },
    /// Xero refused the transaction. The reservation was rolled back, so the
    /// payment may be pushed again later.
    Rejected {
        /// Payment hash.
        payment_hash: String,
        /// Response status.
        status: StatusCode,
        /// Response body.
        body: String,
    },
}

impl PushOutcome {
    /// Payment hash the outcome refers to.
    #[must_use]
    pub fn payment_hash(&self) -> &str {
        match self {
            PushOutcome::Pushed { payment_hash, .. }
            | PushOutcome::Skipped { payment_hash, .. }
            | PushOutcome::Rejected { payment_hash, .. } => payment_hash,
        }
    }

    fn skipped(payment: &Payment, reason: SkipReason) -> Self {
        debug!("Skipping payment {}: {reason}", payment.payment_hash);
        PushOutcome::Skipped {
            payment_hash: payment.payment_hash.clone(),
            reason,
        }
    }
}

impl<S: Storage + 'static, C: LedgerClient> XeroSync<S, C> {
    /// Push one payment of `wallet` to Xero, at most once.
    ///
    /// The payment hash is reserved in storage before Xero is called. The
    /// reservation is confirmed if Xero accepts the transaction and removed if
    /// it does not, so a failed push can be retried. If another push of the
    /// same payment holds the reservation, this one is skipped.
    ///
    /// `known_synced` is an optional set of payment hashes already present in
    /// storage; when given, it replaces the storage lookup and is extended with
    /// every hash this call reserves.
    ///
    /// Once Xero has accepted the transaction the outcome is
    /// [`PushOutcome::Pushed`], even if the confirmation cannot be stored. It
    /// is then kept in memory and retried by
    /// [`XeroSync::sweep_stale_reservations`].
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails before Xero is called, or if no
    /// response could be obtained from Xero. In the latter case the
    /// reservation has been rolled back.
    pub async fn push_payment(
        &self,
        payment: &Payment,
        wallet: &WalletConfig,
        settings: &ExtensionSettings,
        token: &AccessToken,
        known_synced: Option<&mut HashSet<String>>,
    ) -> Result<PushOutcome, XeroSyncError> {
        let payment_hash = &payment.payment_hash;

        let already_synced = match known_synced.as_deref() {
            Some(known) => known.contains(payment_hash),
            None => self.store.get_synced(payment_hash).await?.is_some(),
        };
        if already_synced {
            return Ok(PushOutcome::skipped(payment, SkipReason::AlreadySynced));
        }

        let built = match build_transaction(payment, wallet, settings, Utc::now()) {
            Ok(built) => built,
            Err(reason) => return Ok(PushOutcome::skipped(payment, reason)),
        };

        let reservation =
            SyncedPayment::reservation(&wallet.user_id, &wallet.wallet, payment_hash, Utc::now());
        if self.store.reserve(reservation).await? == Reservation::AlreadyExists {
            return Ok(PushOutcome::skipped(payment, SkipReason::AlreadySynced));
        }
        if let Some(known) = known_synced {
            known.insert(payment_hash.clone());
        }

        let response = match self
            .client
            .create_bank_transactions(token, &built.payload)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                self.roll_back(payment_hash).await;
                return Err(e.into());
            }
        };

        if !response.is_success() {
            self.roll_back(payment_hash).await;
            let body = response.text();
            error!(
                "Xero rejected payment {payment_hash} of wallet {} with HTTP {}: {body}",
                wallet.wallet, response.status
            );
            return Ok(PushOutcome::Rejected {
                payment_hash: payment_hash.clone(),
                status: response.status,
                body,
            });
        }

        let bank_transaction_id = response.bank_transaction_id();
        if bank_transaction_id.is_none() {
            warn!("Xero accepted payment {payment_hash} but returned no BankTransactionID");
        }
        let confirmation = Confirmation {
            xero_bank_transaction_id: bank_transaction_id.clone(),
            currency: built.currency.clone(),
            amount: built.amount,
            confirmed_at: Utc::now(),
        };
        match self.store.confirm(payment_hash, confirmation.clone()).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                warn!("Reservation of payment {payment_hash} vanished before it was confirmed");
            }
            Err(e) => {
                // Xero has the transaction, so this is still a push. The
                // reservation must outlive the stale sweep until the
                // confirmation is stored.
                error!(
                    "Xero accepted payment {payment_hash} but its confirmation could not be stored: {e}"
                );
                self.unconfirmed
                    .lock()
                    .await
                    .insert(payment_hash.clone(), confirmation);
            }
        }
        debug!(
            "Pushed payment {payment_hash} to Xero: {} {}",
            built.amount, built.currency
        );

        Ok(PushOutcome::Pushed {
            payment_hash: payment_hash.clone(),
            bank_transaction_id,
            amount: built.amount,
            currency: built.currency,
        })
    }

    async fn roll_back(&self, payment_hash: &str) {
        if let Err(e) = self.store.release(payment_hash).await {
            error!(
                "Failed to roll back reservation of payment {payment_hash}, it will be removed once stale: {e}"
            );
        }
    }
}
