use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::{AccountMargin, OrderRequest};
use crate::error::Result;

/// The four broker operations the order workflow depends on.
///
/// Session and login lifecycle is owned elsewhere; implementations are
/// expected to be authenticated before they are handed out.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BrokerApi: Send + Sync {
    /// Broker-computed total margin for the order
    async fn order_margin(&self, request: &OrderRequest) -> Result<Decimal>;

    /// Last traded price of `exchange:symbol`
    async fn last_price(&self, exchange: &str, symbol: &str) -> Result<Decimal>;

    /// Current account funds
    async fn account_margin(&self) -> Result<AccountMargin>;

    /// Place the order, returning the broker order id
    async fn place_order(&self, request: &OrderRequest) -> Result<String>;
}
