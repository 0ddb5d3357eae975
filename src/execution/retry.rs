use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, warn};

use super::submitter::SubmitOrder;
use crate::config::ExecutionConfig;
use crate::coordination::ShutdownToken;
use crate::domain::{OrderOutcome, WatchlistEntry};

/// Fixed-delay retry budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Always at least 1.
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn from_config(config: &ExecutionConfig) -> Self {
        Self::new(
            config.retry_attempts,
            Duration::from_secs(config.retry_delay_secs),
        )
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&ExecutionConfig::default())
    }
}

/// Lifecycle of one entry inside the controller
#[derive(Debug, Clone, PartialEq, Eq)]
enum RetryState {
    Attempting { attempt: u32 },
    RetryScheduled { attempt: u32, last: OrderOutcome },
    Succeeded(OrderOutcome),
    Exhausted(OrderOutcome),
}

/// Re-submits failed entries with a fixed delay.
///
/// Every failure is retried the same way; broker rejections are not told
/// apart from transient faults. A cancelled token stops further attempts and
/// cuts the current delay short.
pub struct RetryController {
    submitter: Arc<dyn SubmitOrder>,
    policy: RetryPolicy,
    shutdown: ShutdownToken,
}

impl RetryController {
    pub fn new(submitter: Arc<dyn SubmitOrder>, policy: RetryPolicy) -> Self {
        Self {
            submitter,
            policy,
            shutdown: ShutdownToken::never(),
        }
    }

    pub fn with_shutdown(mut self, token: ShutdownToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Submit with the configured policy
    pub async fn run(&self, entry: &WatchlistEntry) -> OrderOutcome {
        self.submit_with_policy(entry, self.policy).await
    }

    /// Submit with an explicit budget. `max_attempts == 0` is treated as 1.
    pub async fn submit_with_retry(
        &self,
        entry: &WatchlistEntry,
        max_attempts: u32,
        delay: Duration,
    ) -> OrderOutcome {
        self.submit_with_policy(entry, RetryPolicy::new(max_attempts, delay))
            .await
    }

    async fn submit_with_policy(&self, entry: &WatchlistEntry, policy: RetryPolicy) -> OrderOutcome {
        let symbol = entry.trading_symbol.as_str();
        let mut state = RetryState::Attempting { attempt: 1 };

        loop {
            state = match state {
                RetryState::Attempting { attempt } => {
                    debug!("Attempt {}/{} for {}", attempt, policy.max_attempts, symbol);
                    let outcome = self.submitter.submit(entry).await;
                    if outcome.is_success() {
                        RetryState::Succeeded(outcome)
                    } else if attempt >= policy.max_attempts {
                        error!(
                            "Order for {} failed after {} attempts: {}",
                            symbol,
                            attempt,
                            outcome.error_message().unwrap_or("unknown error")
                        );
                        RetryState::Exhausted(outcome)
                    } else {
                        warn!(
                            "Attempt {}/{} for {} failed: {}. Retrying in {}s...",
                            attempt,
                            policy.max_attempts,
                            symbol,
                            outcome.error_message().unwrap_or("unknown error"),
                            policy.delay.as_secs_f64()
                        );
                        RetryState::RetryScheduled {
                            attempt,
                            last: outcome,
                        }
                    }
                }
                RetryState::RetryScheduled { attempt, last } => {
                    if self.shutdown.is_cancelled() {
                        warn!("Shutdown requested, abandoning retries for {}", symbol);
                        RetryState::Exhausted(last)
                    } else {
                        tokio::select! {
                            _ = sleep(policy.delay) => RetryState::Attempting { attempt: attempt + 1 },
                            _ = self.shutdown.cancelled() => {
                                warn!("Shutdown requested, abandoning retries for {}", symbol);
                                RetryState::Exhausted(last)
                            }
                        }
                    }
                }
                RetryState::Succeeded(outcome) | RetryState::Exhausted(outcome) => {
                    return outcome;
                }
            };
        }
    }
}
