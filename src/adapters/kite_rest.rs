//! Kite Connect REST adapter (native Rust, no external SDK dependency).
//!
//! Only the calls the order workflow and session handling need are covered.
//! Every response goes through the `{status, data}` envelope check so that
//! malformed payloads surface here as errors and never reach the order logic.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::BrokerConfig;
use crate::domain::{AccountMargin, OrderRequest};
use crate::error::{AutobuyError, Result};
use crate::exchange::BrokerApi;

const DEFAULT_KITE_API_BASE: &str = "https://api.kite.trade";
const KITE_API_VERSION: &str = "3";

/// Body of an outgoing call
enum RequestBody {
    Empty,
    Json(Value),
    Form(Vec<(&'static str, String)>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub user_name: String,
}

#[derive(Clone)]
pub struct KiteClient {
    http: Client,
    base_url: String,
    api_key: String,
    access_token: Option<String>,
    variety: String,
    dry_run: bool,
}

impl KiteClient {
    pub fn new(
        base_url: Option<&str>,
        api_key: &str,
        variety: &str,
        timeout: Duration,
        dry_run: bool,
    ) -> Result<Self> {
        let base_url = base_url
            .unwrap_or(DEFAULT_KITE_API_BASE)
            .trim_end_matches('/')
            .to_string();

        let http = Client::builder()
            .user_agent("autobuy-kite-adapter/0.1")
            .timeout(timeout)
            .build()
            .map_err(|e| AutobuyError::Internal(format!("failed to build Kite HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            api_key: api_key.to_string(),
            access_token: None,
            variety: variety.to_string(),
            dry_run,
        })
    }

    pub fn from_config(config: &BrokerConfig, variety: &str, dry_run: bool) -> Result<Self> {
        Self::new(
            Some(&config.api_base),
            &config.api_key,
            variety,
            Duration::from_secs(config.timeout_secs),
            dry_run || config.dry_run,
        )
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn set_access_token(&mut self, token: impl Into<String>) {
        self.access_token = Some(token.into());
    }

    /// Checksum the session endpoint expects: hex(sha256(key + request_token + secret))
    pub fn session_checksum(api_key: &str, request_token: &str, api_secret: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(api_key.as_bytes());
        hasher.update(request_token.as_bytes());
        hasher.update(api_secret.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn auth_headers(&self) -> Result<HeaderMap> {
        let token = self
            .access_token
            .as_ref()
            .ok_or_else(|| AutobuyError::Auth("access token is not set".to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("token {}:{}", self.api_key, token))
                .map_err(|e| AutobuyError::Auth(format!("invalid Kite auth header: {}", e)))?,
        );
        Ok(headers)
    }

    async fn request_json(
        &self,
        method: Method,
        path: &str,
        query: Option<&[(&str, String)]>,
        body: RequestBody,
        require_auth: bool,
    ) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);

        let mut req = self
            .http
            .request(method.clone(), &url)
            .header(
                HeaderName::from_static("x-kite-version"),
                HeaderValue::from_static(KITE_API_VERSION),
            );

        if let Some(query) = query {
            req = req.query(query);
        }

        if require_auth {
            req = req.headers(self.auth_headers()?);
        }

        req = match body {
            RequestBody::Empty => req,
            RequestBody::Json(body) => req.header(CONTENT_TYPE, "application/json").json(&body),
            RequestBody::Form(fields) => req.form(&fields),
        };

        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        debug!("Kite {} {} -> {}", method, path, status);
        parse_envelope(&method, path, status, &text)
    }

    /// Profile of the logged-in user; doubles as an access-token check
    pub async fn profile(&self) -> Result<UserProfile> {
        let data = self
            .request_json(Method::GET, "/user/profile", None, RequestBody::Empty, true)
            .await?;
        serde_json::from_value(data)
            .map_err(|e| AutobuyError::InvalidResponse(format!("profile payload: {}", e)))
    }

    /// Exchange a login request token for an access token
    pub async fn generate_session(&self, request_token: &str, api_secret: &str) -> Result<String> {
        let checksum = Self::session_checksum(&self.api_key, request_token, api_secret);
        let form = vec![
            ("api_key", self.api_key.clone()),
            ("request_token", request_token.to_string()),
            ("checksum", checksum),
        ];

        let data = self
            .request_json(Method::POST, "/session/token", None, RequestBody::Form(form), false)
            .await?;

        data.get("access_token")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| AutobuyError::InvalidResponse("session payload has no access_token".into()))
    }

    fn margin_params(&self, request: &OrderRequest) -> Value {
        json!([{
            "exchange": request.exchange,
            "tradingsymbol": request.symbol,
            "transaction_type": request.side.as_str(),
            "variety": self.variety,
            "product": request.product.as_str(),
            "order_type": request.order_type.as_str(),
            "quantity": request.quantity,
            "price": request.price.and_then(|p| p.to_f64()).unwrap_or(0.0),
            "trigger_price": 0,
        }])
    }

    fn order_form(request: &OrderRequest) -> Vec<(&'static str, String)> {
        let mut form = vec![
            ("tradingsymbol", request.symbol.clone()),
            ("exchange", request.exchange.clone()),
            ("transaction_type", request.side.as_str().to_string()),
            ("order_type", request.order_type.as_str().to_string()),
            ("quantity", request.quantity.to_string()),
            ("product", request.product.as_str().to_string()),
            ("validity", "DAY".to_string()),
        ];
        if let Some(price) = request.price {
            form.push(("price", price.normalize().to_string()));
        }
        form
    }
}

/// Unwrap the Kite `{status, data}` envelope.
fn parse_envelope(method: &Method, path: &str, status: StatusCode, text: &str) -> Result<Value> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(AutobuyError::RateLimited(format!(
            "Kite API rate limited for {} {}",
            method, path
        )));
    }

    let body: Value = match serde_json::from_str(text) {
        Ok(body) => body,
        Err(e) if status.is_success() => {
            return Err(AutobuyError::InvalidResponse(format!(
                "{} {}: invalid JSON: {}",
                method, path, e
            )))
        }
        Err(_) => {
            return Err(AutobuyError::Broker(format!(
                "Kite API {} {} failed: status={} body={}",
                method, path, status, text
            )))
        }
    };

    let is_error = body.get("status").and_then(Value::as_str) == Some("error");
    if !status.is_success() || is_error {
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        let error_type = body.get("error_type").and_then(Value::as_str).unwrap_or("");

        return Err(match error_type {
            "TokenException" => AutobuyError::Auth(message),
            _ => AutobuyError::Broker(message),
        });
    }

    body.get("data").cloned().ok_or_else(|| {
        AutobuyError::InvalidResponse(format!("{} {}: response has no data", method, path))
    })
}

fn parse_decimalish(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => Decimal::from_str_exact(s.trim()).ok(),
        Value::Number(n) => {
            let raw = n.to_string();
            Decimal::from_str_exact(&raw)
                .or_else(|_| Decimal::from_scientific(&raw))
                .ok()
        }
        _ => None,
    }
}

fn require_decimal(value: Option<&Value>, what: &str) -> Result<Decimal> {
    value
        .and_then(parse_decimalish)
        .ok_or_else(|| AutobuyError::InvalidResponse(format!("{} missing or not numeric", what)))
}

#[async_trait]
impl BrokerApi for KiteClient {
    async fn order_margin(&self, request: &OrderRequest) -> Result<Decimal> {
        let data = self
            .request_json(
                Method::POST,
                "/margins/orders",
                None,
                RequestBody::Json(self.margin_params(request)),
                true,
            )
            .await?;

        require_decimal(data.get(0).and_then(|m| m.get("total")), "order margin total")
    }

    async fn last_price(&self, exchange: &str, symbol: &str) -> Result<Decimal> {
        let key = format!("{}:{}", exchange, symbol);
        let query = [("i", key.clone())];
        let data = self
            .request_json(Method::GET, "/quote/ltp", Some(&query), RequestBody::Empty, true)
            .await?;

        require_decimal(
            data.get(&key).and_then(|q| q.get("last_price")),
            &format!("last_price for {}", key),
        )
    }

    async fn account_margin(&self) -> Result<AccountMargin> {
        let data = self
            .request_json(Method::GET, "/user/margins", None, RequestBody::Empty, true)
            .await?;

        let cash = require_decimal(
            data.pointer("/equity/available/cash"),
            "equity available cash",
        )?;
        Ok(AccountMargin {
            available_cash: cash,
        })
    }

    async fn place_order(&self, request: &OrderRequest) -> Result<String> {
        if self.dry_run {
            let order_id = format!("DRY-{}", Uuid::new_v4().simple());
            info!(
                "[DRY RUN] Would place {} {} x{} {}:{} ({})",
                request.side, request.order_type, request.quantity, request.exchange, request.symbol, order_id
            );
            return Ok(order_id);
        }

        let path = format!("/orders/{}", self.variety);
        let data = self
            .request_json(
                Method::POST,
                &path,
                None,
                RequestBody::Form(Self::order_form(request)),
                true,
            )
            .await?;

        match data.get("order_id") {
            Some(Value::String(id)) => Ok(id.clone()),
            Some(Value::Number(id)) => Ok(id.to_string()),
            _ => Err(AutobuyError::InvalidResponse(
                "place order payload has no order_id".to_string(),
            )),
        }
    }
}
