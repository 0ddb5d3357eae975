//! Watchlist file loading
//!
//! One CSV row per instrument. Header names matter, column order does not,
//! and unknown columns are ignored.

use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

use crate::domain::{OrderType, WatchlistEntry};
use crate::error::{AutobuyError, Result};

pub const REQUIRED_COLUMNS: [&str; 5] = [
    "trading_symbol",
    "quantity",
    "order_type",
    "limit_price",
    "is_active",
];

#[derive(Debug, Deserialize)]
struct WatchlistRecord {
    trading_symbol: String,
    quantity: String,
    order_type: String,
    limit_price: String,
    is_active: String,
}

/// Load the active entries of the watchlist at `path`
pub fn load_watchlist(path: &Path) -> Result<Vec<WatchlistEntry>> {
    let file = File::open(path).map_err(|e| {
        AutobuyError::Validation(format!(
            "failed to open watchlist {}: {}",
            path.display(),
            e
        ))
    })?;
    let entries = load_watchlist_from_reader(file)?;
    info!(
        "Loaded {} active watchlist entries from {}",
        entries.len(),
        path.display()
    );
    Ok(entries)
}

pub fn load_watchlist_from_reader<R: Read>(reader: R) -> Result<Vec<WatchlistEntry>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|col| !headers.iter().any(|h| h.eq_ignore_ascii_case(col)))
        .map(|col| col.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(AutobuyError::WatchlistSchema { missing });
    }
    let headers = csv::StringRecord::from(
        headers
            .iter()
            .map(|h| h.to_ascii_lowercase())
            .collect::<Vec<_>>(),
    );

    let mut entries = Vec::new();
    let mut inactive = 0usize;
    for result in reader.records() {
        let record = result?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let row: WatchlistRecord = record.deserialize(Some(&headers))?;

        let entry = parse_row(&row).map_err(|e| {
            AutobuyError::Validation(format!("watchlist line {}: {}", line, e))
        })?;
        if entry.is_active {
            entries.push(entry);
        } else {
            inactive += 1;
        }
    }

    debug!(
        "Watchlist parsed: {} active, {} inactive",
        entries.len(),
        inactive
    );
    Ok(entries)
}

fn parse_row(row: &WatchlistRecord) -> std::result::Result<WatchlistEntry, String> {
    let quantity = row
        .quantity
        .parse::<u32>()
        .map_err(|_| format!("invalid quantity '{}'", row.quantity))?;
    let order_type = row
        .order_type
        .parse::<OrderType>()
        .map_err(reason)?;
    let limit_price = match order_type {
        OrderType::Market => None,
        OrderType::Limit if row.limit_price.is_empty() => None,
        OrderType::Limit => Some(
            row.limit_price
                .parse::<Decimal>()
                .map_err(|_| format!("invalid limit_price '{}'", row.limit_price))?,
        ),
    };
    let is_active = parse_flag(&row.is_active)
        .ok_or_else(|| format!("invalid is_active '{}'", row.is_active))?;

    WatchlistEntry::new(
        &row.trading_symbol,
        quantity,
        order_type,
        limit_price,
        is_active,
    )
    .map_err(reason)
}

fn reason(err: AutobuyError) -> String {
    match err {
        AutobuyError::Validation(msg) => msg,
        other => other.to_string(),
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => Some(true),
        "false" | "0" | "no" | "n" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn load(csv: &str) -> Result<Vec<WatchlistEntry>> {
        load_watchlist_from_reader(csv.as_bytes())
    }

    #[test]
    fn keeps_active_rows_in_file_order() {
        let entries = load(
            "trading_symbol,quantity,order_type,limit_price,is_active\n\
             RELIANCE,10,MARKET,,TRUE\n\
             NSE:TCS,2,limit,3400.50,yes\n\
             INFY,5,MARKET,,False\n\
             BSE:SBIN,1,MARKET,999,1\n",
        )
        .unwrap();

        let symbols: Vec<_> = entries.iter().map(|e| e.trading_symbol.as_str()).collect();
        assert_eq!(symbols, ["RELIANCE", "NSE:TCS", "BSE:SBIN"]);
        assert_eq!(entries[1].order_type, OrderType::Limit);
        assert_eq!(entries[1].limit_price, Some(dec!(3400.50)));
        assert_eq!(entries[2].limit_price, None);
    }

    #[test]
    fn column_order_and_extras_do_not_matter() {
        let entries = load(
            "is_active,notes,limit_price,order_type,quantity,trading_symbol\n\
             true,core holding,,MARKET,3,HDFCBANK\n",
        )
        .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].quantity, 3);
    }

    #[test]
    fn missing_columns_are_listed() {
        let err = load("trading_symbol,quantity\nINFY,1\n").unwrap_err();
        match err {
            AutobuyError::WatchlistSchema { missing } => {
                assert_eq!(missing, ["order_type", "limit_price", "is_active"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn malformed_row_names_line() {
        let err = load(
            "trading_symbol,quantity,order_type,limit_price,is_active\n\
             INFY,1,MARKET,,true\n\
             TCS,0,MARKET,,true\n",
        )
        .unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("line 3"), "{err}");
    }

    #[test]
    fn half_empty_symbol_names_line() {
        let err = load(
            "trading_symbol,quantity,order_type,limit_price,is_active\n\
             NSE:INFY,1,MARKET,,true\n\
             NSE:,1,MARKET,,false\n",
        )
        .unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("line 3"), "{err}");
        assert!(err.to_string().contains("NSE:"), "{err}");
    }

    #[test]
    fn limit_row_without_price_is_rejected() {
        let err = load(
            "trading_symbol,quantity,order_type,limit_price,is_active\n\
             TCS,1,LIMIT,,true\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("limit_price"));
    }

    #[test]
    fn blank_flag_means_inactive() {
        let entries = load(
            "trading_symbol,quantity,order_type,limit_price,is_active\n\
             TCS,1,MARKET,,\n",
        )
        .unwrap();
        assert!(entries.is_empty());
        assert_eq!(parse_flag("maybe"), None);
    }
}
