//! Long-running operation polling.
//!
//! Every mutating call returns an [`Operation`]. The [`OperationWaiter`]
//! polls it with bounded exponential backoff until it is done, the optional
//! timeout elapses or the caller cancels.

use async_trait::async_trait;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{ConvergeError, OperationError, Result};

use super::client::ApiClient;
use super::types::Operation;

/// Read access to operation status.
#[async_trait]
pub trait OperationApi: Send + Sync {
    /// Fetches the current state of an operation.
    async fn get_operation(&self, operation_id: &str) -> Result<Operation>;
}

/// Operation service of the operation endpoint.
#[derive(Debug, Clone)]
pub struct OperationService {
    client: ApiClient,
}

impl OperationService {
    /// Creates the service over a client bound to the operation endpoint.
    #[must_use]
    pub const fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl OperationApi for OperationService {
    async fn get_operation(&self, operation_id: &str) -> Result<Operation> {
        self.client
            .get(&format!("/operations/{operation_id}"), &[])
            .await
    }
}

/// Poll schedule of the waiter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaitPolicy {
    /// Delay before the first poll.
    pub initial_interval: Duration,
    /// Upper bound of the poll interval.
    pub max_interval: Duration,
    /// Growth factor applied after each poll.
    pub multiplier: f64,
    /// Overall deadline; unbounded when `None`.
    pub timeout: Option<Duration>,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(10),
            multiplier: 2.0,
            timeout: None,
        }
    }
}

impl WaitPolicy {
    /// Sets the overall deadline.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the first and maximum poll intervals.
    #[must_use]
    pub const fn with_intervals(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_interval = initial;
        self.max_interval = max;
        self
    }

    /// Returns the interval that follows `current`.
    #[must_use]
    ///
    /// Saturates at `max_interval`, including when the product does not fit
    /// a [`Duration`].
    pub fn next_interval(&self, current: Duration) -> Duration {
        let grown = current.as_secs_f64() * self.multiplier.max(1.0);
        Duration::try_from_secs_f64(grown).map_or(self.max_interval, |d| d.min(self.max_interval))
    }
}

/// Waits for operations to finish.
pub struct OperationWaiter<'a, O: OperationApi + ?Sized> {
    operations: &'a O,
    policy: WaitPolicy,
    cancel: Option<watch::Receiver<bool>>,
}

impl<'a, O: OperationApi + ?Sized> OperationWaiter<'a, O> {
    /// Creates a waiter with the default poll schedule.
    #[must_use]
    pub fn new(operations: &'a O) -> Self {
        Self {
            operations,
            policy: WaitPolicy::default(),
            cancel: None,
        }
    }

    /// Sets the poll schedule.
    #[must_use]
    pub const fn with_policy(mut self, policy: WaitPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Aborts waits once the receiver observes `true`.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Waits until the operation is done.
    ///
    /// An operation that is already done is evaluated without polling.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::Failed`] if the operation finished with an
    /// error, [`OperationError::TimedOut`] or [`OperationError::Cancelled`] if
    /// the wait was cut short, and propagates transport errors from polling.
    pub async fn wait(&self, operation: Operation) -> Result<Operation> {
        let operation_id = operation.id.clone();
        let started = Instant::now();
        let mut interval = self.policy.initial_interval;
        let mut current = operation;
        let mut cancel = self.cancel.clone();
        let mut polls = 0u32;

        while !current.done {
            let delay = match self.policy.timeout {
                Some(timeout) => {
                    let remaining = timeout.saturating_sub(started.elapsed());
                    if remaining.is_zero() {
                        warn!("Operation {operation_id} still running after {timeout:?}");
                        return Err(ConvergeError::Operation(OperationError::TimedOut {
                            operation_id,
                            waited_secs: started.elapsed().as_secs(),
                        }));
                    }
                    interval.min(remaining)
                }
                None => interval,
            };

            if Self::sleep_or_cancel(delay, cancel.as_mut()).await {
                info!("Wait for operation {operation_id} cancelled");
                return Err(ConvergeError::Operation(OperationError::Cancelled { operation_id }));
            }

            polls += 1;
            current = self.operations.get_operation(&operation_id).await?;
            debug!(
                "Operation {operation_id} poll {polls}: done={} ({:?} elapsed)",
                current.done,
                started.elapsed()
            );
            interval = self.policy.next_interval(interval);
        }

        if let Some(failure) = current.error {
            warn!(
                "Operation {operation_id} failed with code {}: {}",
                failure.code, failure.message
            );
            return Err(ConvergeError::Operation(OperationError::Failed {
                operation_id,
                code: failure.code,
                message: failure.message,
            }));
        }

        debug!("Operation {operation_id} finished after {polls} polls");
        Ok(current)
    }

    /// Sleeps for `delay`; returns true if cancellation was observed first.
    async fn sleep_or_cancel(delay: Duration, cancel: Option<&mut watch::Receiver<bool>>) -> bool {
        let Some(cancel) = cancel else {
            tokio::time::sleep(delay).await;
            return false;
        };

        if *cancel.borrow_and_update() {
            return true;
        }

        tokio::select! {
            () = tokio::time::sleep(delay) => false,
            changed = cancel.changed() => match changed {
                Ok(()) => *cancel.borrow(),
                // Sender dropped: nobody can cancel any more, finish the sleep.
                Err(_) => {
                    tokio::time::sleep(delay).await;
                    false
                }
            },
        }
    }
}
