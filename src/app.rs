//! Application wiring
//!
//! Builds the broker session, notifier and batch runner from `AppConfig`,
//! then runs one batch per trading day, either on the daily schedule or once
//! on demand.

use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::calendar::TradingCalendar;
use crate::config::AppConfig;
use crate::coordination::ShutdownToken;
use crate::error::Result;
use crate::exchange::{build_broker_client, BrokerApi};
use crate::execution::{BatchReport, BatchRunner, OrderSubmitter, RetryController, RetryPolicy};
use crate::notify::{Notification, NotificationManager, Notifier};
use crate::watchlist::load_watchlist;

pub struct App {
    config: AppConfig,
    calendar: TradingCalendar,
    notifier: Arc<dyn Notifier>,
    runner: BatchRunner,
    shutdown: ShutdownToken,
}

impl App {
    /// Authenticate against the broker and assemble the pipeline.
    ///
    /// Authentication failures are notified before being returned.
    pub async fn bootstrap(config: AppConfig, dry_run: bool, shutdown: ShutdownToken) -> Result<Self> {
        let notifier: Arc<dyn Notifier> =
            Arc::new(NotificationManager::from_config(&config.notifications));

        let broker = match build_broker_client(&config, dry_run).await {
            Ok(broker) => broker,
            Err(e) => {
                error!("Authentication failed: {}", e);
                notifier
                    .notify(&Notification::authentication_failure(&e.to_string()))
                    .await;
                return Err(e);
            }
        };

        Self::with_components(config, broker, notifier, shutdown)
    }

    /// Assemble the pipeline around an already authenticated broker
    pub fn with_components(
        config: AppConfig,
        broker: Arc<dyn BrokerApi>,
        notifier: Arc<dyn Notifier>,
        shutdown: ShutdownToken,
    ) -> Result<Self> {
        let calendar = TradingCalendar::from_config(&config.schedule)?;
        let submitter = Arc::new(OrderSubmitter::new(
            broker,
            config.execution.default_exchange.clone(),
        ));
        let retry = RetryController::new(submitter, RetryPolicy::from_config(&config.execution));
        let runner = BatchRunner::new(retry, notifier.clone(), calendar.tz())
            .with_shutdown(shutdown.clone());

        Ok(Self {
            config,
            calendar,
            notifier,
            runner,
            shutdown,
        })
    }

    /// Today's batch, unless the exchange is closed
    pub async fn run_scheduled_batch(&self) -> Result<Option<BatchReport>> {
        let today = self.calendar.local_date(&Utc::now());
        self.run_batch_for(today).await
    }

    /// The batch for `date`; `Ok(None)` when `date` is not a trading day
    pub async fn run_batch_for(&self, date: NaiveDate) -> Result<Option<BatchReport>> {
        if !self.calendar.is_trading_day(date) {
            let reason = if self.calendar.is_holiday(date) {
                "exchange holiday"
            } else {
                "weekend"
            };
            info!("Not a trading day ({}): {}. Skipping order placement", reason, date);
            self.notifier
                .notify(&Notification::batch_skipped(date, reason))
                .await;
            return Ok(None);
        }

        self.execute_batch().await.map(Some)
    }

    async fn execute_batch(&self) -> Result<BatchReport> {
        let entries = match load_watchlist(&self.config.watchlist.path) {
            Ok(entries) => entries,
            Err(e) => {
                error!("Error loading stock configuration: {}", e);
                self.notifier
                    .notify(&Notification::watchlist_error(&e.to_string()))
                    .await;
                return Err(e);
            }
        };

        Ok(self.runner.run_batch(&entries).await)
    }

    /// Run the batch at the configured time every day until shutdown
    pub async fn run_scheduler(&self) -> Result<()> {
        let schedule = &self.config.schedule;
        self.notifier
            .notify(&Notification::scheduler_started(
                &schedule.run_at,
                &schedule.timezone,
            ))
            .await;

        loop {
            let now = Utc::now();
            let next = self.calendar.next_run_after(&now);
            let wait = (next.with_timezone(&Utc) - now).to_std().unwrap_or_default();
            info!("Next order run at {} (in {}s)", next, wait.as_secs());

            tokio::select! {
                _ = sleep(wait) => {}
                _ = self.shutdown.cancelled() => {
                    info!("Scheduler stopped");
                    return Ok(());
                }
            }

            match self.run_scheduled_batch().await {
                Ok(Some(report)) if report.cancelled => {
                    warn!("Batch interrupted by shutdown");
                }
                Ok(Some(report)) => info!(
                    "Scheduled batch finished: {}/{} orders placed",
                    report.summary.success_count, report.summary.total
                ),
                Ok(None) => {}
                Err(e) => error!("Scheduled batch failed: {}", e),
            }

            if self.shutdown.is_cancelled() {
                info!("Scheduler stopped");
                return Ok(());
            }
        }
    }
}
