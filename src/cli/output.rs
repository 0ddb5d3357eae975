//! Output formatting for batch reports.
//!
//! Supports two modes: human-readable tables (default) and JSON (--json).

use serde::Serialize;
use tabled::{Table, Tabled};

use crate::domain::OrderOutcome;
use crate::execution::BatchReport;

/// Output mode for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Table,
    Json,
}

impl OutputMode {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            OutputMode::Json
        } else {
            OutputMode::Table
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
pub struct OutcomeRow {
    #[tabled(rename = "Symbol")]
    pub symbol: String,
    #[tabled(rename = "Status")]
    pub status: String,
    #[tabled(rename = "Order ID")]
    pub order_id: String,
    #[tabled(rename = "Error")]
    pub error: String,
    #[tabled(rename = "Time")]
    pub timestamp: String,
}

impl From<&OrderOutcome> for OutcomeRow {
    fn from(outcome: &OrderOutcome) -> Self {
        Self {
            symbol: outcome.symbol().to_string(),
            status: if outcome.is_success() { "PLACED" } else { "FAILED" }.to_string(),
            order_id: outcome.order_id().unwrap_or("-").to_string(),
            error: outcome.error_message().unwrap_or("").to_string(),
            timestamp: outcome.timestamp().unwrap_or("").to_string(),
        }
    }
}

/// Render a report in the chosen mode
pub fn render_report(report: &BatchReport, mode: OutputMode) -> anyhow::Result<String> {
    match mode {
        OutputMode::Json => Ok(serde_json::to_string_pretty(report)?),
        OutputMode::Table => {
            let mut out = if report.outcomes.is_empty() {
                "(no orders)".to_string()
            } else {
                let rows: Vec<OutcomeRow> = report.outcomes.iter().map(OutcomeRow::from).collect();
                Table::new(rows).to_string()
            };
            out.push_str(&format!(
                "\nTotal: {}  Successful: {}  Failed: {}",
                report.summary.total, report.summary.success_count, report.summary.failure_count
            ));
            if report.cancelled {
                out.push_str("  (cancelled)");
            }
            Ok(out)
        }
    }
}

pub fn print_report(report: &BatchReport, mode: OutputMode) -> anyhow::Result<()> {
    println!("{}", render_report(report, mode)?);
    Ok(())
}

/// Print a warning message.
pub fn print_warn(msg: &str) {
    println!("\x1b[33m{msg}\x1b[0m");
}
