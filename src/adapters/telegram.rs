//! Telegram bot notifications

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::error::{AutobuyError, Result};
use crate::notify::NotificationChannel;

#[derive(Clone)]
pub struct TelegramNotifier {
    client: Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

impl TelegramNotifier {
    pub fn new(api_base: &str, bot_token: String, chat_id: String) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            bot_token,
            chat_id,
        }
    }

    fn send_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.bot_token)
    }

    pub async fn send_message(&self, text: &str) -> Result<()> {
        let resp = self
            .client
            .post(self.send_url())
            .json(&SendMessage {
                chat_id: &self.chat_id,
                text,
            })
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            debug!("Telegram notification sent");
            return Ok(());
        }

        let body = resp.text().await.unwrap_or_default();
        Err(AutobuyError::Notification(format!(
            "Telegram HTTP {}: {}",
            status, body
        )))
    }
}

#[async_trait]
impl NotificationChannel for TelegramNotifier {
    fn name(&self) -> &'static str {
        "telegram"
    }

    async fn deliver(&self, _subject: &str, text: &str) -> Result<()> {
        self.send_message(text).await
    }
}
