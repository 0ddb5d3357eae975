use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info};

use super::margin::{MarginEstimator, MarginGuard};
use crate::domain::{OrderOutcome, OrderRequest, WatchlistEntry};
use crate::exchange::BrokerApi;

/// A single, non-retried order attempt
#[async_trait]
pub trait SubmitOrder: Send + Sync {
    /// Never fails: every error is folded into a failed outcome
    async fn submit(&self, entry: &WatchlistEntry) -> OrderOutcome;
}

/// Margin-gated delivery buy against the broker
pub struct OrderSubmitter {
    broker: Arc<dyn BrokerApi>,
    estimator: MarginEstimator,
    guard: MarginGuard,
    default_exchange: String,
}

impl OrderSubmitter {
    pub fn new(broker: Arc<dyn BrokerApi>, default_exchange: impl Into<String>) -> Self {
        Self {
            estimator: MarginEstimator::new(broker.clone()),
            guard: MarginGuard::new(broker.clone()),
            broker,
            default_exchange: default_exchange.into(),
        }
    }
}

#[async_trait]
impl SubmitOrder for OrderSubmitter {
    async fn submit(&self, entry: &WatchlistEntry) -> OrderOutcome {
        let request = OrderRequest::from_entry(entry, &self.default_exchange);
        let symbol = entry.trading_symbol.as_str();

        info!(
            "Placing {} BUY for {}: {} shares{}",
            request.order_type,
            request.instrument(),
            request.quantity,
            request
                .price
                .map(|p| format!(" @ {}", p))
                .unwrap_or_default()
        );

        let estimate = self.estimator.estimate(&request).await;
        let check = self.guard.check(&estimate).await;
        if let Some(message) = check.shortfall_message(symbol) {
            error!("{}", message);
            return OrderOutcome::failed(symbol, message);
        }

        match self.broker.place_order(&request).await {
            Ok(order_id) => {
                info!("Order placed successfully for {}. Order ID: {}", symbol, order_id);
                OrderOutcome::placed(symbol, order_id)
            }
            Err(e) => {
                error!("Failed to place order for {}: {}", symbol, e);
                OrderOutcome::failed(symbol, e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AccountMargin, OrderType};
    use crate::error::AutobuyError;
    use crate::exchange::MockBrokerApi;
    use rust_decimal_macros::dec;

    fn funded(cash: rust_decimal::Decimal) -> MockBrokerApi {
        let mut broker = MockBrokerApi::new();
        broker
            .expect_account_margin()
            .returning(move || Ok(AccountMargin { available_cash: cash }));
        broker
    }

    #[tokio::test]
    async fn places_order_when_margin_suffices() {
        let mut broker = funded(dec!(50000));
        broker.expect_order_margin().returning(|_| Ok(dec!(25000)));
        broker
            .expect_place_order()
            .times(1)
            .returning(|request| {
                assert_eq!(request.exchange, "NSE");
                assert_eq!(request.symbol, "RELIANCE");
                assert_eq!(request.order_type, OrderType::Limit);
                assert_eq!(request.price, Some(dec!(2500)));
                Ok("240102000123".to_string())
            });

        let submitter = OrderSubmitter::new(Arc::new(broker), "NSE");
        let entry = WatchlistEntry::limit("RELIANCE", 10, dec!(2500)).unwrap();
        let outcome = submitter.submit(&entry).await;

        assert!(outcome.is_success());
        assert_eq!(outcome.symbol(), "RELIANCE");
        assert_eq!(outcome.order_id(), Some("240102000123"));
    }

    #[tokio::test]
    async fn insufficient_margin_never_reaches_broker() {
        let mut broker = funded(dec!(1000));
        broker.expect_order_margin().returning(|_| Ok(dec!(14520)));
        broker.expect_place_order().never();

        let submitter = OrderSubmitter::new(Arc::new(broker), "NSE");
        let entry = WatchlistEntry::market("NSE:INFY", 10).unwrap();
        let outcome = submitter.submit(&entry).await;

        assert!(!outcome.is_success());
        assert_eq!(outcome.symbol(), "NSE:INFY");
        assert_eq!(
            outcome.error_message(),
            Some("Insufficient margin for NSE:INFY. Required: 14520, available: 1000")
        );
    }

    #[tokio::test]
    async fn unpriceable_order_is_blocked() {
        let mut broker = MockBrokerApi::new();
        broker
            .expect_order_margin()
            .returning(|_| Err(AutobuyError::Broker("down".into())));
        broker
            .expect_last_price()
            .returning(|_, _| Err(AutobuyError::Broker("down".into())));
        broker.expect_account_margin().never();
        broker.expect_place_order().never();

        let submitter = OrderSubmitter::new(Arc::new(broker), "NSE");
        let outcome = submitter
            .submit(&WatchlistEntry::market("TCS", 1).unwrap())
            .await;
        assert!(!outcome.is_success());
    }

    #[tokio::test]
    async fn broker_rejection_becomes_failed_outcome() {
        let mut broker = funded(dec!(100000));
        broker.expect_order_margin().returning(|_| Ok(dec!(10)));
        broker
            .expect_place_order()
            .returning(|_| Err(AutobuyError::Broker("Markets are closed right now.".into())));

        let submitter = OrderSubmitter::new(Arc::new(broker), "NSE");
        let outcome = submitter
            .submit(&WatchlistEntry::market("SBIN", 1).unwrap())
            .await;

        assert!(!outcome.is_success());
        assert!(outcome
            .error_message()
            .unwrap()
            .contains("Markets are closed right now."));
        assert_eq!(outcome.order_id(), None);
    }
}
