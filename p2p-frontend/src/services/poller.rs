//! Background status polling for transactions that are still ACCEPTED.
//!
//! Each tick checks its targets one after another. A failed check is
//! logged and retried on the next tick; there is no backoff.

use crate::services::transactions::TransactionService;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollTarget {
    /// One transaction; polling stops once it reaches a final status.
    Single(String),
    /// Every stored transaction that is still pending.
    AllPending,
}

/// Running poller. Dropping the handle does not stop the task; call
/// [`PollerHandle::shutdown`].
pub struct PollerHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl PollerHandle {
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop polling and wait for the task to exit. A check that is in
    /// flight finishes and stores its result first.
    pub async fn shutdown(self) {
        self.token.cancel();
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Status poller task ended abnormally");
        }
    }
}

pub struct StatusPoller;

impl StatusPoller {
    /// Start polling. The first check happens one `interval` after spawn.
    pub fn spawn(
        service: Arc<TransactionService>,
        target: PollTarget,
        interval: Duration,
    ) -> PollerHandle {
        let token = CancellationToken::new();
        let task_token = token.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            tracing::info!(poll_target = ?target, interval_ms = interval.as_millis() as u64, "Status poller started");

            loop {
                tokio::select! {
                    _ = task_token.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                // A check that has started runs to completion, cancelled or not.
                if !poll_once(&service, &target).await {
                    break;
                }
            }

            tracing::info!(poll_target = ?target, "Status poller stopped");
        });

        PollerHandle { token, task }
    }
}

/// Run one round of checks. Returns `false` when there is nothing left to
/// poll for a single-transaction target.
pub async fn poll_once(service: &TransactionService, target: &PollTarget) -> bool {
    match target {
        PollTarget::Single(tracker_id) => {
            match service.get(tracker_id).await {
                Ok(record) if record.status().is_terminal() => return false,
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(tracker_id = %tracker_id, error = %e, "Cannot poll transaction");
                    return false;
                }
            }

            match service.refresh_status(tracker_id).await {
                Ok(status) => !status.is_terminal(),
                Err(e) => {
                    tracing::warn!(tracker_id = %tracker_id, error = %e, "Status check failed");
                    true
                }
            }
        }
        PollTarget::AllPending => {
            let pending = match service.pending().await {
                Ok(pending) => pending,
                Err(e) => {
                    tracing::warn!(error = %e, "Cannot read pending transactions");
                    return true;
                }
            };

            for record in pending {
                if let Err(e) = service.refresh_status(record.tracker_id()).await {
                    tracing::warn!(
                        tracker_id = %record.tracker_id(),
                        error = %e,
                        "Status check failed"
                    );
                }
            }
            true
        }
    }
}
