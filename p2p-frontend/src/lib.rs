pub mod config;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;

use config::{PollingScope, PollingSettings};
use services::{PollTarget, PollerHandle, StatusPoller, TransactionService};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub transactions: Arc<TransactionService>,
    pub polling: PollingSettings,
    latest_poller: Arc<Mutex<Option<PollerHandle>>>,
}

impl AppState {
    pub fn new(transactions: Arc<TransactionService>, polling: PollingSettings) -> Self {
        Self {
            transactions,
            polling,
            latest_poller: Arc::new(Mutex::new(None)),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.polling.interval_seconds.max(1))
    }

    /// With `latest` polling, replace the poller following the previous
    /// transaction with one following `tracker_id`. No-op for other scopes.
    pub async fn follow_latest(&self, tracker_id: &str) {
        if self.polling.scope != PollingScope::Latest {
            return;
        }

        let mut slot = self.latest_poller.lock().await;
        if let Some(previous) = slot.take() {
            tokio::spawn(previous.shutdown());
        }
        *slot = Some(StatusPoller::spawn(
            self.transactions.clone(),
            PollTarget::Single(tracker_id.to_string()),
            self.poll_interval(),
        ));
    }

    pub async fn shutdown_pollers(&self) {
        if let Some(poller) = self.latest_poller.lock().await.take() {
            poller.shutdown().await;
        }
    }
}
