//! End-to-end batch runs against an in-memory broker.

use async_trait::async_trait;
use autobuy::app::App;
use autobuy::config::{
    AppConfig, BrokerConfig, ExecutionConfig, LoggingConfig, NotificationConfig, ScheduleConfig,
    WatchlistConfig,
};
use autobuy::coordination::ShutdownToken;
use autobuy::domain::{AccountMargin, OrderRequest};
use autobuy::error::{AutobuyError, Result};
use autobuy::exchange::BrokerApi;
use autobuy::notify::{Notification, NotificationLevel, Notifier};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Prices every symbol from a table; rejects orders for listed symbols
struct PaperBroker {
    prices: HashMap<String, Decimal>,
    cash: Decimal,
    reject: Vec<String>,
    placed: Mutex<Vec<OrderRequest>>,
}

impl PaperBroker {
    fn new(cash: Decimal) -> Self {
        let prices = [
            ("INFY", dec!(1500)),
            ("TCS", dec!(3500)),
            ("RELIANCE", dec!(2500)),
            ("SBIN", dec!(600)),
            ("MRF", dec!(120000)),
        ]
        .into_iter()
        .map(|(s, p)| (s.to_string(), p))
        .collect();
        Self {
            prices,
            cash,
            reject: Vec::new(),
            placed: Mutex::new(Vec::new()),
        }
    }

    fn placed_symbols(&self) -> Vec<String> {
        self.placed
            .lock()
            .unwrap()
            .iter()
            .map(|r| format!("{}:{}", r.exchange, r.symbol))
            .collect()
    }
}

#[async_trait]
impl BrokerApi for PaperBroker {
    async fn order_margin(&self, request: &OrderRequest) -> Result<Decimal> {
        let price = match request.price {
            Some(limit) => limit,
            None => self.last_price(&request.exchange, &request.symbol).await?,
        };
        Ok(price * Decimal::from(request.quantity))
    }

    async fn last_price(&self, _exchange: &str, symbol: &str) -> Result<Decimal> {
        self.prices
            .get(symbol)
            .copied()
            .ok_or_else(|| AutobuyError::InvalidResponse(format!("no quote for {}", symbol)))
    }

    async fn account_margin(&self) -> Result<AccountMargin> {
        Ok(AccountMargin {
            available_cash: self.cash,
        })
    }

    async fn place_order(&self, request: &OrderRequest) -> Result<String> {
        if self.reject.contains(&request.symbol) {
            return Err(AutobuyError::Broker("Instrument is blocked".into()));
        }
        let mut placed = self.placed.lock().unwrap();
        placed.push(request.clone());
        Ok(format!("2401{:08}", placed.len()))
    }
}

#[derive(Default)]
struct Inbox {
    received: Mutex<Vec<Notification>>,
}

impl Inbox {
    fn subjects(&self) -> Vec<String> {
        self.received
            .lock()
            .unwrap()
            .iter()
            .map(|n| n.subject.clone())
            .collect()
    }
}

#[async_trait]
impl Notifier for Inbox {
    async fn notify(&self, notification: &Notification) {
        self.received.lock().unwrap().push(notification.clone());
    }
}

fn workspace() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("autobuy-flow-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn config(dir: &Path, holidays: Vec<NaiveDate>) -> AppConfig {
    AppConfig {
        broker: BrokerConfig {
            api_base: "http://127.0.0.1:9".into(),
            api_key: "key".into(),
            api_secret: "secret".into(),
            access_token: None,
            request_token: None,
            session_file: dir.join("session.json"),
            timeout_secs: 1,
            dry_run: true,
        },
        execution: ExecutionConfig {
            retry_attempts: 2,
            retry_delay_secs: 0,
            ..Default::default()
        },
        schedule: ScheduleConfig {
            holidays,
            ..Default::default()
        },
        watchlist: WatchlistConfig {
            path: dir.join("stocks.csv"),
        },
        notifications: NotificationConfig::default(),
        logging: LoggingConfig::default(),
    }
}

/// A regular trading day
fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 29).unwrap()
}

fn app(dir: &Path, broker: Arc<PaperBroker>, inbox: Arc<Inbox>) -> App {
    App::with_components(config(dir, Vec::new()), broker, inbox, ShutdownToken::never()).unwrap()
}

#[tokio::test]
async fn places_affordable_orders_and_reports_the_rest() {
    let dir = workspace();
    std::fs::write(
        dir.join("stocks.csv"),
        "trading_symbol,quantity,order_type,limit_price,is_active\n\
         INFY,10,MARKET,,true\n\
         NSE:TCS,2,LIMIT,3400,true\n\
         MRF,1,MARKET,,true\n\
         RELIANCE,4,MARKET,,false\n\
         BSE:SBIN,5,MARKET,,yes\n",
    )
    .unwrap();

    let broker = Arc::new(PaperBroker::new(dec!(50000)));
    let inbox = Arc::new(Inbox::default());
    let report = app(&dir, broker.clone(), inbox.clone())
        .run_batch_for(monday())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(report.summary.total, 4);
    assert_eq!(report.summary.success_count, 3);
    assert_eq!(report.summary.failure_count, 1);
    assert_eq!(broker.placed_symbols(), ["NSE:INFY", "NSE:TCS", "BSE:SBIN"]);

    let mrf = &report.outcomes[2];
    assert!(!mrf.is_success());
    assert!(mrf
        .error_message()
        .unwrap()
        .starts_with("Insufficient margin for MRF"));

    assert_eq!(
        inbox.subjects(),
        [
            "Order Placed: INFY",
            "Order Placed: NSE:TCS",
            "Order Failed: MRF",
            "Order Placed: BSE:SBIN",
            "Order Placement Summary",
        ]
    );

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn broker_rejection_is_retried_then_recorded() {
    let dir = workspace();
    std::fs::write(
        dir.join("stocks.csv"),
        "trading_symbol,quantity,order_type,limit_price,is_active\n\
         SBIN,1,MARKET,,true\n\
         INFY,1,MARKET,,true\n",
    )
    .unwrap();

    let mut broker = PaperBroker::new(dec!(100000));
    broker.reject.push("SBIN".into());
    let broker = Arc::new(broker);
    let inbox = Arc::new(Inbox::default());

    let report = app(&dir, broker.clone(), inbox.clone())
        .run_batch_for(monday())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(report.summary.success_count, 1);
    assert_eq!(report.summary.failure_count, 1);
    assert!(report.outcomes[0]
        .error_message()
        .unwrap()
        .contains("Instrument is blocked"));
    assert_eq!(broker.placed_symbols(), ["NSE:INFY"]);

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn broken_watchlist_is_reported_once() {
    let dir = workspace();
    std::fs::write(dir.join("stocks.csv"), "trading_symbol,quantity\nINFY,1\n").unwrap();

    let broker = Arc::new(PaperBroker::new(dec!(100000)));
    let inbox = Arc::new(Inbox::default());
    let err = app(&dir, broker.clone(), inbox.clone())
        .run_batch_for(monday())
        .await
        .unwrap_err();

    assert!(err.is_configuration());
    assert!(broker.placed_symbols().is_empty());
    let received = inbox.received.lock().unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].subject, "Stock Configuration Error");
    assert_eq!(received[0].level, NotificationLevel::Error);

    drop(received);
    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn non_trading_days_are_skipped() {
    let dir = workspace();
    std::fs::write(
        dir.join("stocks.csv"),
        "trading_symbol,quantity,order_type,limit_price,is_active\nINFY,1,MARKET,,true\n",
    )
    .unwrap();

    let holiday = NaiveDate::from_ymd_opt(2024, 1, 26).unwrap();
    let broker = Arc::new(PaperBroker::new(dec!(100000)));
    let inbox = Arc::new(Inbox::default());
    let app = App::with_components(
        config(&dir, vec![holiday]),
        broker.clone(),
        inbox.clone(),
        ShutdownToken::never(),
    )
    .unwrap();

    // Republic Day, then a Saturday
    assert!(app.run_batch_for(holiday).await.unwrap().is_none());
    let saturday = NaiveDate::from_ymd_opt(2024, 1, 27).unwrap();
    assert!(app.run_batch_for(saturday).await.unwrap().is_none());
    assert!(broker.placed_symbols().is_empty());
    assert_eq!(
        inbox.subjects(),
        ["Order Placement Skipped", "Order Placement Skipped"]
    );

    let report = app.run_batch_for(monday()).await.unwrap().unwrap();
    assert_eq!(report.summary.success_count, 1);

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn on_demand_run_respects_todays_holiday() {
    let dir = workspace();
    std::fs::write(
        dir.join("stocks.csv"),
        "trading_symbol,quantity,order_type,limit_price,is_active\nINFY,1,MARKET,,true\n",
    )
    .unwrap();

    let today = Utc::now().with_timezone(&chrono_tz::Asia::Kolkata).date_naive();
    let broker = Arc::new(PaperBroker::new(dec!(100000)));
    let inbox = Arc::new(Inbox::default());
    let app = App::with_components(
        config(&dir, vec![today]),
        broker.clone(),
        inbox.clone(),
        ShutdownToken::never(),
    )
    .unwrap();

    assert!(app.run_scheduled_batch().await.unwrap().is_none());
    assert!(broker.placed_symbols().is_empty());
    assert_eq!(inbox.subjects(), ["Order Placement Skipped"]);

    let _ = std::fs::remove_dir_all(&dir);
}
