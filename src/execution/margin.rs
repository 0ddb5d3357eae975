use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::domain::{MarginEstimate, OrderRequest};
use crate::exchange::BrokerApi;

/// Estimates the capital an order needs.
///
/// Broker-reported order margin first, `last price × quantity` second, and
/// [`MarginEstimate::Unbounded`] when neither can be obtained. Never fails.
pub struct MarginEstimator {
    broker: Arc<dyn BrokerApi>,
}

impl MarginEstimator {
    pub fn new(broker: Arc<dyn BrokerApi>) -> Self {
        Self { broker }
    }

    pub async fn estimate(&self, request: &OrderRequest) -> MarginEstimate {
        let err = match self.broker.order_margin(request).await {
            Ok(total) => {
                debug!("Broker margin for {}: {}", request.instrument(), total);
                return MarginEstimate::Amount(total.max(Decimal::ZERO));
            }
            Err(e) => e,
        };

        warn!(
            "Failed to check margin requirements for {}: {}",
            request.instrument(),
            err
        );

        match self
            .broker
            .last_price(&request.exchange, &request.symbol)
            .await
        {
            Ok(price) => {
                let amount = price.max(Decimal::ZERO) * Decimal::from(request.quantity);
                info!(
                    "Estimated margin for {} from last price {} x {}: {}",
                    request.instrument(),
                    price,
                    request.quantity,
                    amount
                );
                MarginEstimate::Amount(amount)
            }
            Err(e) => {
                error!(
                    "Could not estimate margin for {}: {}. Order will be blocked.",
                    request.instrument(),
                    e
                );
                MarginEstimate::Unbounded
            }
        }
    }
}

/// Result of comparing an estimate with live account funds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarginCheck {
    Sufficient {
        required: Decimal,
        available: Decimal,
    },
    Insufficient {
        required: MarginEstimate,
        available: Option<Decimal>,
    },
    /// Account funds could not be read. The order is let through.
    Unverified { required: MarginEstimate },
}

impl MarginCheck {
    pub fn permits(&self) -> bool {
        !matches!(self, MarginCheck::Insufficient { .. })
    }

    /// Operator-facing description of a blocked order
    pub fn shortfall_message(&self, symbol: &str) -> Option<String> {
        match self {
            MarginCheck::Insufficient {
                required,
                available: Some(available),
            } => Some(format!(
                "Insufficient margin for {}. Required: {}, available: {}",
                symbol,
                required,
                available.round_dp(2)
            )),
            MarginCheck::Insufficient {
                required,
                available: None,
            } => Some(format!(
                "Insufficient margin for {}. Required: {} (margin could not be estimated)",
                symbol, required
            )),
            _ => None,
        }
    }
}

/// Decides whether the account can pay for an order.
///
/// Fails open: if account funds cannot be fetched the order is permitted.
/// An unbounded estimate is always refused, whatever the account holds.
pub struct MarginGuard {
    broker: Arc<dyn BrokerApi>,
}

impl MarginGuard {
    pub fn new(broker: Arc<dyn BrokerApi>) -> Self {
        Self { broker }
    }

    pub async fn check(&self, estimate: &MarginEstimate) -> MarginCheck {
        let required = match estimate {
            MarginEstimate::Amount(amount) => *amount,
            MarginEstimate::Unbounded => {
                return MarginCheck::Insufficient {
                    required: *estimate,
                    available: None,
                }
            }
        };

        match self.broker.account_margin().await {
            Ok(account) => {
                info!(
                    "Margin check: Required {}, Available {}",
                    required.round_dp(2),
                    account.available_cash
                );
                if account.available_cash >= required {
                    MarginCheck::Sufficient {
                        required,
                        available: account.available_cash,
                    }
                } else {
                    MarginCheck::Insufficient {
                        required: *estimate,
                        available: Some(account.available_cash),
                    }
                }
            }
            Err(e) => {
                // TODO: make fail-open a config switch once operators agree on a default
                warn!(
                    "Failed to check user margins: {}. Permitting order without verification",
                    e
                );
                MarginCheck::Unverified {
                    required: *estimate,
                }
            }
        }
    }

    pub async fn has_sufficient_margin(&self, estimate: &MarginEstimate) -> bool {
        self.check(estimate).await.permits()
    }
}
