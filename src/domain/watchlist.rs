use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{AutobuyError, Result};

/// Order type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    Market,
    Limit,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Market => "MARKET",
            OrderType::Limit => "LIMIT",
        }
    }
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OrderType {
    type Err = AutobuyError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "MARKET" => Ok(OrderType::Market),
            "LIMIT" => Ok(OrderType::Limit),
            other => Err(AutobuyError::Validation(format!(
                "invalid order_type '{}'; expected MARKET|LIMIT",
                other
            ))),
        }
    }
}

/// One configured instrument from the watchlist file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchlistEntry {
    /// `SYMBOL` or `EXCHANGE:SYMBOL`
    pub trading_symbol: String,
    pub quantity: u32,
    pub order_type: OrderType,
    /// Set iff `order_type` is `Limit`
    pub limit_price: Option<Decimal>,
    pub is_active: bool,
}

impl WatchlistEntry {
    /// Build an entry, enforcing the quantity and limit-price rules.
    pub fn new(
        trading_symbol: &str,
        quantity: u32,
        order_type: OrderType,
        limit_price: Option<Decimal>,
        is_active: bool,
    ) -> Result<Self> {
        let trading_symbol = trading_symbol.trim();
        if trading_symbol.is_empty() {
            return Err(AutobuyError::Validation("trading_symbol is empty".into()));
        }
        if trading_symbol.contains(':') {
            let instrument = Instrument::parse(trading_symbol, "");
            if instrument.exchange.is_empty() || instrument.symbol.is_empty() {
                return Err(AutobuyError::Validation(format!(
                    "trading_symbol '{}' must be SYMBOL or EXCHANGE:SYMBOL",
                    trading_symbol
                )));
            }
        }
        if quantity == 0 {
            return Err(AutobuyError::Validation(format!(
                "quantity for {} must be positive",
                trading_symbol
            )));
        }

        let limit_price = match order_type {
            OrderType::Market => None,
            OrderType::Limit => match limit_price {
                Some(price) if price > Decimal::ZERO => Some(price),
                Some(price) => {
                    return Err(AutobuyError::Validation(format!(
                        "limit_price for {} must be positive, got {}",
                        trading_symbol, price
                    )))
                }
                None => {
                    return Err(AutobuyError::Validation(format!(
                        "LIMIT order for {} needs a limit_price",
                        trading_symbol
                    )))
                }
            },
        };

        Ok(Self {
            trading_symbol: trading_symbol.to_string(),
            quantity,
            order_type,
            limit_price,
            is_active,
        })
    }

    pub fn market(trading_symbol: &str, quantity: u32) -> Result<Self> {
        Self::new(trading_symbol, quantity, OrderType::Market, None, true)
    }

    pub fn limit(trading_symbol: &str, quantity: u32, price: Decimal) -> Result<Self> {
        Self::new(trading_symbol, quantity, OrderType::Limit, Some(price), true)
    }

    /// Split `EXCHANGE:SYMBOL`, falling back to `default_exchange`.
    pub fn instrument(&self, default_exchange: &str) -> Instrument {
        Instrument::parse(&self.trading_symbol, default_exchange)
    }
}

/// Exchange/symbol pair as the broker addresses it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instrument {
    pub exchange: String,
    pub symbol: String,
}

impl Instrument {
    pub fn parse(raw: &str, default_exchange: &str) -> Self {
        let raw = raw.trim();
        match raw.split_once(':') {
            Some((exchange, rest)) => Self {
                exchange: exchange.trim().to_string(),
                symbol: rest.rsplit(':').next().unwrap_or(rest).trim().to_string(),
            },
            None => Self {
                exchange: default_exchange.to_string(),
                symbol: raw.to_string(),
            },
        }
    }

    /// `EXCHANGE:SYMBOL` key used by the quote endpoints
    pub fn key(&self) -> String {
        format!("{}:{}", self.exchange, self.symbol)
    }
}

impl std::fmt::Display for Instrument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.exchange, self.symbol)
    }
}
