use tokio::sync::mpsc;
use xerosync::{
    storage::{stores::Sqlite, Storage},
    Payment, XeroSync,
};

use crate::config::XeroConfig;

pub(crate) struct State<S: Storage = Sqlite> {
    pub(crate) xero_sync: XeroSync<S>,
    /// Queue feeding the payment listener.
    pub(crate) payments: mpsc::Sender<Payment>,
    pub(crate) xero: XeroConfig,
}

impl<S: Storage> State<S> {
    pub(crate) fn new(
        xero_sync: XeroSync<S>,
        payments: mpsc::Sender<Payment>,
        xero: XeroConfig,
    ) -> Self {
        Self {
            xero_sync,
            payments,
            xero,
        }
    }
}

impl<S: Storage> Clone for State<S> {
    fn clone(&self) -> Self {
        Self {
            xero_sync: self.xero_sync.clone(),
            payments: self.payments.clone(),
            xero: self.xero.clone(),
        }
    }
}
