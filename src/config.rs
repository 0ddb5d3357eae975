use chrono::{NaiveDate, NaiveTime};
use chrono_tz::Tz;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{AutobuyError, Result};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub broker: BrokerConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub watchlist: WatchlistConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    /// REST API endpoint
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_secret: String,
    /// Access token from a previous login, if any
    #[serde(default)]
    pub access_token: Option<String>,
    /// Request token captured from the login redirect
    #[serde(default)]
    pub request_token: Option<String>,
    /// Where the last good access token is kept (relative to the config dir)
    #[serde(default = "default_session_file")]
    pub session_file: PathBuf,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Never send real orders
    #[serde(default)]
    pub dry_run: bool,
}

fn default_api_base() -> String {
    "https://api.kite.trade".to_string()
}

fn default_session_file() -> PathBuf {
    PathBuf::from("session.json")
}

fn default_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionConfig {
    /// Total submit attempts per watchlist entry
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    /// Fixed delay between attempts
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
    /// Exchange used when a symbol carries no `EXCHANGE:` prefix
    #[serde(default = "default_exchange")]
    pub default_exchange: String,
    /// Kite order variety (URL segment of the place-order call)
    #[serde(default = "default_variety")]
    pub variety: String,
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay_secs() -> u64 {
    2
}

fn default_exchange() -> String {
    "NSE".to_string()
}

fn default_variety() -> String {
    "regular".to_string()
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            retry_attempts: default_retry_attempts(),
            retry_delay_secs: default_retry_delay_secs(),
            default_exchange: default_exchange(),
            variety: default_variety(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    /// Local wall-clock time of the daily run, "HH:MM"
    #[serde(default = "default_run_at")]
    pub run_at: String,
    /// IANA zone name used for the calendar and outcome timestamps
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Exchange holidays on which the batch is skipped
    #[serde(default)]
    pub holidays: Vec<NaiveDate>,
}

fn default_run_at() -> String {
    "09:30".to_string()
}

fn default_timezone() -> String {
    "Asia/Kolkata".to_string()
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            run_at: default_run_at(),
            timezone: default_timezone(),
            holidays: Vec::new(),
        }
    }
}

impl ScheduleConfig {
    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| AutobuyError::Validation(format!("invalid schedule.timezone: {}", e)))
    }

    pub fn run_time(&self) -> Result<NaiveTime> {
        NaiveTime::parse_from_str(self.run_at.trim(), "%H:%M").map_err(|e| {
            AutobuyError::Validation(format!(
                "invalid schedule.run_at '{}' (expected HH:MM): {}",
                self.run_at, e
            ))
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WatchlistConfig {
    #[serde(default = "default_watchlist_path")]
    pub path: PathBuf,
}

fn default_watchlist_path() -> PathBuf {
    PathBuf::from("stocks.csv")
}

impl Default for WatchlistConfig {
    fn default() -> Self {
        Self {
            path: default_watchlist_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct NotificationConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub email: EmailConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub bot_token: Option<String>,
    #[serde(default)]
    pub chat_id: Option<String>,
    #[serde(default = "default_telegram_api")]
    pub api_base: String,
}

fn default_telegram_api() -> String {
    "https://api.telegram.org".to_string()
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bot_token: None,
            chat_id: None,
            api_base: default_telegram_api(),
        }
    }
}

/// Plain text webhook (Feishu/Lark bot format)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct WebhookConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub url: Option<String>,
}

/// SMTP mail through a STARTTLS relay
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub sender: Option<String>,
    /// SMTP password (an app password for Gmail)
    #[serde(default)]
    pub password: Option<String>,
    /// Comma-separated addresses
    #[serde(default)]
    pub recipients: String,
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
}

fn default_smtp_host() -> String {
    "smtp.gmail.com".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            sender: None,
            password: None,
            recipients: String::new(),
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Flat variable names used by existing `.env` files, mapped onto config keys.
const LEGACY_ENV_KEYS: &[(&str, &str)] = &[
    ("API_KEY", "broker.api_key"),
    ("API_SECRET", "broker.api_secret"),
    ("ACCESS_TOKEN", "broker.access_token"),
    ("REQUEST_TOKEN", "broker.request_token"),
    ("RETRY_ATTEMPTS", "execution.retry_attempts"),
    ("RETRY_DELAY_SECONDS", "execution.retry_delay_secs"),
    ("ENABLE_TELEGRAM_NOTIFICATIONS", "notifications.telegram.enabled"),
    ("TELEGRAM_BOT_TOKEN", "notifications.telegram.bot_token"),
    ("TELEGRAM_CHAT_ID", "notifications.telegram.chat_id"),
    ("ENABLE_EMAIL_NOTIFICATIONS", "notifications.email.enabled"),
    ("EMAIL_SENDER", "notifications.email.sender"),
    ("EMAIL_PASSWORD", "notifications.email.password"),
    ("EMAIL_RECIPIENTS", "notifications.email.recipients"),
    ("FEISHU_WEBHOOK_URL", "notifications.webhook.url"),
];

/// A flat variable counts only when it holds something; blank template
/// lines must not mask values from the config files.
fn legacy_env(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

impl AppConfig {
    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref();

        let env_file = ensure_env_file(config_dir)?;
        // Real environment wins over the file
        if let Err(e) = dotenvy::from_path(&env_file) {
            warn!("Could not read {}: {}", env_file.display(), e);
        }

        let mut builder = Config::builder()
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("AUTOBUY_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (AUTOBUY__EXECUTION__RETRY_ATTEMPTS, etc.)
            .add_source(
                Environment::with_prefix("AUTOBUY")
                    .separator("__")
                    .try_parsing(true),
            );

        for (var, key) in LEGACY_ENV_KEYS {
            builder = builder.set_override_option(*key, legacy_env(var))?;
        }
        if legacy_env("FEISHU_WEBHOOK_URL").is_some() {
            builder = builder.set_override("notifications.webhook.enabled", true)?;
        }

        let mut config: AppConfig = builder.build()?.try_deserialize()?;
        config.resolve_paths(config_dir);
        config.validate()?;

        info!("Configuration loaded from {}", config_dir.display());
        Ok(config)
    }

    fn resolve_paths(&mut self, config_dir: &Path) {
        if self.watchlist.path.is_relative() {
            self.watchlist.path = config_dir.join(&self.watchlist.path);
        }
        if self.broker.session_file.is_relative() {
            self.broker.session_file = config_dir.join(&self.broker.session_file);
        }
    }

    /// Check settings that would otherwise fail halfway through a run
    pub fn validate(&self) -> Result<()> {
        if self.broker.api_key.trim().is_empty() || self.broker.api_secret.trim().is_empty() {
            return Err(AutobuyError::Validation(
                "API key or secret not found in configuration".to_string(),
            ));
        }
        if self.execution.default_exchange.trim().is_empty() {
            return Err(AutobuyError::Validation(
                "execution.default_exchange must not be empty".to_string(),
            ));
        }
        self.schedule.tz()?;
        self.schedule.run_time()?;
        Ok(())
    }
}

/// Make sure `<dir>/.env` exists, seeding it from `.env.template` when needed.
pub fn ensure_env_file(config_dir: &Path) -> Result<PathBuf> {
    let env_file = config_dir.join(".env");
    if env_file.exists() {
        return Ok(env_file);
    }

    warn!("Environment file not found at {}", env_file.display());
    let template = config_dir.join(".env.template");
    if !template.exists() {
        return Err(AutobuyError::Validation(format!(
            "neither {} nor {} exists",
            env_file.display(),
            template.display()
        )));
    }

    info!("Creating .env file from template");
    std::fs::copy(&template, &env_file)?;
    Ok(env_file)
}
