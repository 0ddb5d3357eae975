use chrono::Utc;
use chrono_tz::Tz;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::retry::RetryController;
use crate::coordination::ShutdownToken;
use crate::domain::{BatchSummary, OrderOutcome, WatchlistEntry};
use crate::notify::{Notification, Notifier};

/// Timestamp format used on outcomes and notifications
pub const OUTCOME_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Everything one batch run produced
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    /// One per processed active entry, in watchlist order
    pub outcomes: Vec<OrderOutcome>,
    pub summary: BatchSummary,
    /// Stopped early by a shutdown request
    pub cancelled: bool,
}

/// Walks the watchlist sequentially, one order at a time.
pub struct BatchRunner {
    retry: RetryController,
    notifier: Arc<dyn Notifier>,
    tz: Tz,
    shutdown: ShutdownToken,
}

impl BatchRunner {
    pub fn new(retry: RetryController, notifier: Arc<dyn Notifier>, tz: Tz) -> Self {
        Self {
            retry,
            notifier,
            tz,
            shutdown: ShutdownToken::never(),
        }
    }

    /// Observe shutdown between entries and during retry delays
    pub fn with_shutdown(mut self, token: ShutdownToken) -> Self {
        self.retry = self.retry.with_shutdown(token.clone());
        self.shutdown = token;
        self
    }

    pub async fn run_batch(&self, entries: &[WatchlistEntry]) -> BatchReport {
        info!("Starting order placement for {} watchlist entries", entries.len());

        let mut outcomes = Vec::with_capacity(entries.len());
        let mut cancelled = false;

        for entry in entries {
            if !entry.is_active {
                debug!("Skipping inactive entry {}", entry.trading_symbol);
                continue;
            }
            if self.shutdown.is_cancelled() {
                warn!(
                    "Shutdown requested, stopping batch after {} orders",
                    outcomes.len()
                );
                cancelled = true;
                break;
            }

            info!("Processing order for {}", entry.trading_symbol);
            let outcome = self.retry.run(entry).await.stamped(self.now());
            self.notifier.notify(&Notification::for_outcome(&outcome)).await;
            outcomes.push(outcome);
        }

        let summary = BatchSummary::from_outcomes(&outcomes);
        info!(
            "Completed order placement. Total: {}, Success: {}, Failed: {}",
            summary.total, summary.success_count, summary.failure_count
        );
        self.notifier
            .notify(&Notification::batch_summary(&summary, cancelled))
            .await;

        BatchReport {
            outcomes,
            summary,
            cancelled,
        }
    }

    fn now(&self) -> String {
        Utc::now()
            .with_timezone(&self.tz)
            .format(OUTCOME_TIME_FORMAT)
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordination::Shutdown;
    use crate::execution::{RetryPolicy, SubmitOrder};
    use async_trait::async_trait;
    use chrono::NaiveDateTime;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Succeeds for every symbol not listed in `failing`
    struct BySymbol {
        failing: HashSet<String>,
        seen: Mutex<Vec<String>>,
        shutdown_after_first: Option<Arc<Shutdown>>,
    }

    impl BySymbol {
        fn new(failing: &[&str]) -> Self {
            Self {
                failing: failing.iter().map(|s| s.to_string()).collect(),
                seen: Mutex::new(Vec::new()),
                shutdown_after_first: None,
            }
        }
    }

    #[async_trait]
    impl SubmitOrder for BySymbol {
        async fn submit(&self, entry: &WatchlistEntry) -> OrderOutcome {
            self.seen.lock().unwrap().push(entry.trading_symbol.clone());
            if let Some(shutdown) = &self.shutdown_after_first {
                shutdown.request();
            }
            if self.failing.contains(&entry.trading_symbol) {
                OrderOutcome::failed(&entry.trading_symbol, "Insufficient funds")
            } else {
                OrderOutcome::placed(&entry.trading_symbol, "1001")
            }
        }
    }

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<Notification>>,
    }

    #[async_trait]
    impl Notifier for Recorder {
        async fn notify(&self, notification: &Notification) {
            self.sent.lock().unwrap().push(notification.clone());
        }
    }

    fn runner(submitter: Arc<BySymbol>, notifier: Arc<Recorder>) -> BatchRunner {
        let retry = RetryController::new(submitter, RetryPolicy::new(1, Duration::ZERO));
        BatchRunner::new(retry, notifier, chrono_tz::Asia::Kolkata)
    }

    fn entries(symbols: &[&str]) -> Vec<WatchlistEntry> {
        symbols
            .iter()
            .map(|s| WatchlistEntry::market(s, 1).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn mixed_batch_reports_every_outcome_then_summary() {
        let submitter = Arc::new(BySymbol::new(&["TCS", "WIPRO"]));
        let notifier = Arc::new(Recorder::default());
        let runner = runner(submitter.clone(), notifier.clone());

        let report = runner
            .run_batch(&entries(&["INFY", "TCS", "RELIANCE", "WIPRO", "SBIN"]))
            .await;

        assert_eq!(
            report.summary,
            BatchSummary {
                total: 5,
                success_count: 3,
                failure_count: 2
            }
        );
        assert!(!report.cancelled);
        let symbols: Vec<_> = report.outcomes.iter().map(|o| o.symbol()).collect();
        assert_eq!(symbols, ["INFY", "TCS", "RELIANCE", "WIPRO", "SBIN"]);

        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 6);
        assert_eq!(sent[1].subject, "Order Failed: TCS");
        assert_eq!(sent[5].subject, "Order Placement Summary");
        assert_eq!(sent[5].body, "Orders placed: 5\nSuccessful: 3\nFailed: 2");
    }

    #[tokio::test]
    async fn outcomes_carry_local_timestamp() {
        let submitter = Arc::new(BySymbol::new(&[]));
        let notifier = Arc::new(Recorder::default());
        let report = runner(submitter, notifier).run_batch(&entries(&["INFY"])).await;

        let stamp = report.outcomes[0].timestamp().unwrap();
        assert!(NaiveDateTime::parse_from_str(stamp, OUTCOME_TIME_FORMAT).is_ok());
    }

    #[tokio::test]
    async fn inactive_entries_are_never_submitted() {
        let submitter = Arc::new(BySymbol::new(&[]));
        let notifier = Arc::new(Recorder::default());
        let mut list = entries(&["INFY", "TCS"]);
        list[0].is_active = false;

        let report = runner(submitter.clone(), notifier).run_batch(&list).await;

        assert_eq!(*submitter.seen.lock().unwrap(), vec!["TCS".to_string()]);
        assert_eq!(report.summary.total, 1);
    }

    #[tokio::test]
    async fn empty_watchlist_still_sends_summary() {
        let submitter = Arc::new(BySymbol::new(&[]));
        let notifier = Arc::new(Recorder::default());
        let report = runner(submitter, notifier.clone()).run_batch(&[]).await;

        assert_eq!(report.summary, BatchSummary::default());
        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].body, "Orders placed: 0\nSuccessful: 0\nFailed: 0");
    }

    #[tokio::test]
    async fn shutdown_stops_between_entries() {
        let shutdown = Arc::new(Shutdown::new());
        let mut submitter = BySymbol::new(&[]);
        submitter.shutdown_after_first = Some(shutdown.clone());
        let submitter = Arc::new(submitter);
        let notifier = Arc::new(Recorder::default());

        let report = runner(submitter.clone(), notifier.clone())
            .with_shutdown(shutdown.token())
            .run_batch(&entries(&["INFY", "TCS", "SBIN"]))
            .await;

        assert!(report.cancelled);
        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(submitter.seen.lock().unwrap().len(), 1);
        let sent = notifier.sent.lock().unwrap();
        assert!(sent.last().unwrap().body.contains("cancelled"));
    }
}
