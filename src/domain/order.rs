use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Instrument, OrderType, WatchlistEntry};

/// Order side. Only buys are placed by the batch job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "BUY",
        }
    }
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Product category. Delivery (cash-and-carry): paid in full, no leverage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductType {
    #[serde(rename = "CNC")]
    Delivery,
}

impl ProductType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductType::Delivery => "CNC",
        }
    }
}

impl std::fmt::Display for ProductType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Order request (what we send to the broker)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub exchange: String,
    pub side: OrderSide,
    pub quantity: u32,
    pub product: ProductType,
    pub order_type: OrderType,
    /// Present iff `order_type` is `Limit`
    pub price: Option<Decimal>,
}

impl OrderRequest {
    /// Derive the broker request for a watchlist row
    pub fn from_entry(entry: &WatchlistEntry, default_exchange: &str) -> Self {
        let Instrument { exchange, symbol } = entry.instrument(default_exchange);
        let price = match entry.order_type {
            OrderType::Limit => entry.limit_price,
            OrderType::Market => None,
        };

        Self {
            symbol,
            exchange,
            side: OrderSide::Buy,
            quantity: entry.quantity,
            product: ProductType::Delivery,
            order_type: entry.order_type,
            price,
        }
    }

    pub fn instrument(&self) -> Instrument {
        Instrument {
            exchange: self.exchange.clone(),
            symbol: self.symbol.clone(),
        }
    }
}

/// Capital needed to execute an order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarginEstimate {
    Amount(Decimal),
    /// Nothing could be priced; never satisfiable
    Unbounded,
}

impl std::fmt::Display for MarginEstimate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MarginEstimate::Amount(amount) => write!(f, "{}", amount.round_dp(2)),
            MarginEstimate::Unbounded => write!(f, "unbounded"),
        }
    }
}

/// Live account funds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountMargin {
    pub available_cash: Decimal,
}

/// Terminal result of one watchlist entry in one batch run.
///
/// `order_id` is set iff `success`, `error_message` iff not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderOutcome {
    success: bool,
    symbol: String,
    order_id: Option<String>,
    error_message: Option<String>,
    timestamp: Option<String>,
}

impl OrderOutcome {
    pub fn placed(symbol: impl Into<String>, order_id: impl Into<String>) -> Self {
        Self {
            success: true,
            symbol: symbol.into(),
            order_id: Some(order_id.into()),
            error_message: None,
            timestamp: None,
        }
    }

    pub fn failed(symbol: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            symbol: symbol.into(),
            order_id: None,
            error_message: Some(error.into()),
            timestamp: None,
        }
    }

    /// Stamp the production time; consumes the outcome
    pub fn stamped(self, timestamp: impl Into<String>) -> Self {
        Self {
            timestamp: Some(timestamp.into()),
            ..self
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn order_id(&self) -> Option<&str> {
        self.order_id.as_deref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn timestamp(&self) -> Option<&str> {
        self.timestamp.as_deref()
    }
}

/// Counts over one batch run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub success_count: usize,
    pub failure_count: usize,
}

impl BatchSummary {
    pub fn from_outcomes(outcomes: &[OrderOutcome]) -> Self {
        let total = outcomes.len();
        let success_count = outcomes.iter().filter(|o| o.is_success()).count();
        Self {
            total,
            success_count,
            failure_count: total - success_count,
        }
    }
}
