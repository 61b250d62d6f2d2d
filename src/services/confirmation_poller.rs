use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::app::config::PollSettings;
use crate::models::payment::PaymentStatus;
use crate::services::error::ServiceError;
use crate::services::pix_gateway::PixGateway;

/// One status lookup for a transaction.
#[async_trait]
pub trait StatusCheck: Send + Sync {
    async fn check(&self, transaction_id: &str) -> Result<PaymentStatus, ServiceError>;
}

#[async_trait]
impl StatusCheck for Arc<dyn PixGateway> {
    async fn check(&self, transaction_id: &str) -> Result<PaymentStatus, ServiceError> {
        self.check_pix_status(transaction_id)
            .await
            .map(|report| report.status)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Confirmed {
        transaction_id: String,
        status: PaymentStatus,
        attempts: u32,
    },
    /// The transaction was unset, or every handle to it was dropped.
    Cancelled { attempts: u32 },
    /// A newer transaction replaced the one being watched.
    Superseded { previous: String, attempts: u32 },
    TimedOut { transaction_id: String, attempts: u32 },
}

enum Stop {
    Cancelled,
    Superseded,
}

/// Check, wait, check again: at most one lookup in flight per transaction.
pub struct ConfirmationPoller {
    checker: Arc<dyn StatusCheck>,
    settings: PollSettings,
}

impl ConfirmationPoller {
    pub fn new(checker: Arc<dyn StatusCheck>, settings: PollSettings) -> Self {
        Self { checker, settings }
    }

    /// Spawns a watcher for `transaction_id` and returns the handle that steers it.
    pub fn start(self, transaction_id: impl Into<String>) -> PollHandle {
        let (sender, receiver) = watch::channel(Some(transaction_id.into()));
        let task = tokio::spawn(async move { self.watch(receiver).await });
        PollHandle { sender, task }
    }

    /// Polls whichever transaction `current` holds when it starts.
    pub async fn watch(&self, mut current: watch::Receiver<Option<String>>) -> PollOutcome {
        let Some(transaction_id) = current.borrow_and_update().clone() else {
            return PollOutcome::Cancelled { attempts: 0 };
        };

        let max_attempts = self.settings.max_attempts.max(1);
        let mut attempts = 0;

        loop {
            attempts += 1;

            match self.checker.check(&transaction_id).await {
                Ok(status) if status.is_confirmed() => {
                    info!(%transaction_id, attempts, ?status, "Payment confirmed");
                    return PollOutcome::Confirmed {
                        transaction_id,
                        status,
                        attempts,
                    };
                }
                Ok(status) => debug!(%transaction_id, attempts, ?status, "Waiting for payment"),
                Err(e) => warn!(%transaction_id, attempts, error = %e, "Status check failed"),
            }

            if let Some(stop) = self.stop_requested(&mut current, &transaction_id) {
                return outcome(stop, transaction_id, attempts);
            }

            if attempts >= max_attempts {
                warn!(%transaction_id, attempts, "Giving up on payment confirmation");
                return PollOutcome::TimedOut {
                    transaction_id,
                    attempts,
                };
            }

            if let Err(stop) = self.wait_next_tick(&mut current, &transaction_id).await {
                return outcome(stop, transaction_id, attempts);
            }
        }
    }

    fn stop_requested(
        &self,
        current: &mut watch::Receiver<Option<String>>,
        transaction_id: &str,
    ) -> Option<Stop> {
        match current.has_changed() {
            Ok(false) => None,
            Ok(true) => evaluate(current, transaction_id),
            Err(_) => Some(Stop::Cancelled),
        }
    }

    async fn wait_next_tick(
        &self,
        current: &mut watch::Receiver<Option<String>>,
        transaction_id: &str,
    ) -> Result<(), Stop> {
        let deadline = Instant::now() + self.settings.interval;

        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => return Ok(()),
                changed = current.changed() => {
                    if changed.is_err() {
                        return Err(Stop::Cancelled);
                    }
                    if let Some(stop) = evaluate(current, transaction_id) {
                        return Err(stop);
                    }
                }
            }
        }
    }
}

fn evaluate(current: &mut watch::Receiver<Option<String>>, transaction_id: &str) -> Option<Stop> {
    match current.borrow_and_update().as_deref() {
        None => Some(Stop::Cancelled),
        Some(id) if id != transaction_id => Some(Stop::Superseded),
        Some(_) => None,
    }
}

fn outcome(stop: Stop, transaction_id: String, attempts: u32) -> PollOutcome {
    match stop {
        Stop::Cancelled => {
            info!(%transaction_id, attempts, "Polling cancelled");
            PollOutcome::Cancelled { attempts }
        }
        Stop::Superseded => {
            info!(%transaction_id, attempts, "Polling superseded by a newer transaction");
            PollOutcome::Superseded {
                previous: transaction_id,
                attempts,
            }
        }
    }
}

/// Dropping the handle cancels the watcher at its next suspension point.
pub struct PollHandle {
    sender: watch::Sender<Option<String>>,
    task: JoinHandle<PollOutcome>,
}

impl PollHandle {
    pub fn cancel(&self) {
        self.sender.send_replace(None);
    }

    pub fn supersede(&self, transaction_id: impl Into<String>) {
        self.sender.send_replace(Some(transaction_id.into()));
    }

    /// Waits for the watcher to stop. The handle stays usable, so a caller
    /// can race this against a shutdown signal and then `cancel`.
    pub async fn outcome(&mut self) -> Result<PollOutcome, tokio::task::JoinError> {
        (&mut self.task).await
    }
}
