//! Feishu (Lark) webhook notifications
//!
//! Posts plain text messages to a Feishu bot webhook.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::error::{AutobuyError, Result};
use crate::notify::NotificationChannel;

/// Feishu notification client
#[derive(Clone)]
pub struct FeishuNotifier {
    client: Client,
    webhook_url: String,
}

#[derive(Serialize)]
struct FeishuMessage<'a> {
    msg_type: &'static str,
    content: FeishuContent<'a>,
}

#[derive(Serialize)]
struct FeishuContent<'a> {
    text: &'a str,
}

impl FeishuNotifier {
    /// Create a new Feishu notifier with explicit URL
    pub fn new(webhook_url: String) -> Self {
        Self {
            client: Client::new(),
            webhook_url,
        }
    }

    /// Send a text message to Feishu
    pub async fn send_message(&self, text: &str) -> Result<()> {
        let message = FeishuMessage {
            msg_type: "text",
            content: FeishuContent { text },
        };

        let resp = self
            .client
            .post(&self.webhook_url)
            .json(&message)
            .send()
            .await?;

        if resp.status().is_success() {
            debug!("Feishu notification sent successfully");
            Ok(())
        } else {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            Err(AutobuyError::Notification(format!(
                "Feishu HTTP {}: {}",
                status, body
            )))
        }
    }
}

#[async_trait]
impl NotificationChannel for FeishuNotifier {
    fn name(&self) -> &'static str {
        "feishu"
    }

    async fn deliver(&self, _subject: &str, text: &str) -> Result<()> {
        self.send_message(text).await
    }
}
