//! Operator notifications
//!
//! The batch reports every order outcome plus one summary through the
//! [`Notifier`] seam. [`NotificationManager`] is the production fan-out to
//! chat channels; delivery problems are logged and never reach the caller.

mod manager;

pub use manager::NotificationManager;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::{BatchSummary, OrderOutcome};
use crate::error::Result;

/// Notification severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Error,
}

impl NotificationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationLevel::Info => "INFO",
            NotificationLevel::Success => "SUCCESS",
            NotificationLevel::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for NotificationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub body: String,
    pub level: NotificationLevel,
}

const NOT_AVAILABLE: &str = "Not available";

impl Notification {
    pub fn new(level: NotificationLevel, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
            level,
        }
    }

    /// Text sent to chat channels
    pub fn render(&self) -> String {
        format!("[{}] {}\n\n{}", self.level, self.subject, self.body)
    }

    pub fn order_placed(outcome: &OrderOutcome) -> Self {
        Self::new(
            NotificationLevel::Success,
            format!("Order Placed: {}", outcome.symbol()),
            format!(
                "Order ID: {}\nSymbol: {}\nTimestamp: {}",
                outcome.order_id().unwrap_or(NOT_AVAILABLE),
                outcome.symbol(),
                outcome.timestamp().unwrap_or(NOT_AVAILABLE)
            ),
        )
    }

    pub fn order_failed(outcome: &OrderOutcome) -> Self {
        Self::new(
            NotificationLevel::Error,
            format!("Order Failed: {}", outcome.symbol()),
            format!(
                "Symbol: {}\nError: {}\nTimestamp: {}",
                outcome.symbol(),
                outcome.error_message().unwrap_or("unknown error"),
                outcome.timestamp().unwrap_or(NOT_AVAILABLE)
            ),
        )
    }

    /// Per-order message matching the outcome's status
    pub fn for_outcome(outcome: &OrderOutcome) -> Self {
        if outcome.is_success() {
            Self::order_placed(outcome)
        } else {
            Self::order_failed(outcome)
        }
    }

    pub fn batch_summary(summary: &BatchSummary, cancelled: bool) -> Self {
        let mut body = format!(
            "Orders placed: {}\nSuccessful: {}\nFailed: {}",
            summary.total, summary.success_count, summary.failure_count
        );
        if cancelled {
            body.push_str("\nBatch cancelled before all entries were processed");
        }
        Self::new(NotificationLevel::Info, "Order Placement Summary", body)
    }

    pub fn authentication_failure(error: &str) -> Self {
        Self::new(
            NotificationLevel::Error,
            "Broker Authentication Failed",
            format!(
                "Error: {}\nPlease check your credentials and regenerate access token.",
                error
            ),
        )
    }

    pub fn watchlist_error(error: &str) -> Self {
        Self::new(
            NotificationLevel::Error,
            "Stock Configuration Error",
            format!("Failed to load stock configuration: {}", error),
        )
    }

    pub fn scheduler_started(run_at: &str, timezone: &str) -> Self {
        Self::new(
            NotificationLevel::Info,
            "Autobuy Started",
            format!(
                "Order scheduler has been started. Orders will be placed at {} {} on trading days.",
                run_at, timezone
            ),
        )
    }

    pub fn batch_skipped(date: NaiveDate, reason: &str) -> Self {
        Self::new(
            NotificationLevel::Info,
            "Order Placement Skipped",
            format!("No orders placed on {}: {}", date, reason),
        )
    }
}

/// Receiver of batch events
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification);
}

/// One delivery transport (chat bot, webhook)
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn name(&self) -> &'static str;

    async fn deliver(&self, subject: &str, text: &str) -> Result<()>;
}
