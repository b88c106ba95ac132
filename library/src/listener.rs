//! Pushing payments as the wallet platform reports them.

use log::{debug, error, info, warn};
use tokio::{
    sync::{mpsc, oneshot},
    task::{JoinHandle, JoinSet},
};

use crate::{
    storage::Storage, xero_client::LedgerClient, Payment, PushOutcome, XeroSync, XeroSyncError,
};

impl<S: Storage + 'static, C: LedgerClient> XeroSync<S, C> {
    /// Push a single payment reported by the platform, if its wallet is
    /// configured to push payments.
    ///
    /// Returns `None` if the payment was ignored: it is not settled, no
    /// configuration pushes its wallet, or the owner has no Xero connection.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails, no valid token can be obtained, or
    /// no response could be obtained from Xero.
    pub async fn on_payment(&self, payment: &Payment) -> Result<Option<PushOutcome>, XeroSyncError> {
        if !payment.is_completed() {
            debug!("Ignoring unsettled payment {}", payment.payment_hash);
            return Ok(None);
        }
        let Some(wallet) = self.store.get_pushing_wallet(&payment.wallet_id).await? else {
            return Ok(None);
        };
        let Some(mut connection) = self.store.get_connection(&wallet.user_id).await? else {
            warn!(
                "Wallet {} pushes payments but user {} has no Xero connection",
                wallet.wallet, wallet.user_id
            );
            return Ok(None);
        };
        let settings = self.settings(&wallet.user_id).await?;
        let token = self.ensure_access_token(&mut connection, &settings).await?;

        self.push_payment(payment, &wallet, &settings, &token, None)
            .await
            .map(Some)
    }

    /// Spawn a task pushing every payment received on `payments`, until the
    /// returned handle is stopped or all senders are dropped. Payments are
    /// handled concurrently; failures are logged.
    #[must_use]
    pub fn listen(&self, mut payments: mpsc::Receiver<Payment>) -> ListenerHandle {
        let xero_sync = self.clone();
        let (stop_sender, mut stop_receiver) = oneshot::channel();

        let task = tokio::spawn(async move {
            info!("Payment listener started");
            let mut in_flight = JoinSet::new();
            loop {
                tokio::select! {
                    _ = &mut stop_receiver => {
                        info!("Payment listener received stop signal. Stopping gracefully");
                        break;
                    }
                    payment = payments.recv() => {
                        let Some(payment) = payment else {
                            info!("Payment source closed. Stopping payment listener");
                            break;
                        };
                        let xero_sync = xero_sync.clone();
                        in_flight.spawn(async move {
                            if let Err(e) = xero_sync.on_payment(&payment).await {
                                error!("Failed to push payment {} to Xero: {e}", payment.payment_hash);
                            }
                        });
                    }
                    Some(Err(e)) = in_flight.join_next(), if !in_flight.is_empty() => {
                        error!("Payment push task failed: {e}");
                    }
                }
            }
            while let Some(result) = in_flight.join_next().await {
                if let Err(e) = result {
                    error!("Payment push task failed: {e}");
                }
            }
        });

        ListenerHandle {
            stop: stop_sender,
            task,
        }
    }
}

/// Owned handle of the task started by [`XeroSync::listen`].
#[derive(Debug)]
pub struct ListenerHandle {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl ListenerHandle {
    /// Whether the listener has stopped on its own.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the listener, waiting for payments already being pushed.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener task panicked.
    pub async fn stop(self) -> Result<(), XeroSyncError> {
        // Fails only if the task already exited.
        let _ = self.stop.send(());
        self.task.await?;
        Ok(())
    }
}
