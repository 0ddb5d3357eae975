//! Notification Manager
//!
//! Routes notifications to every enabled channel and always logs them.
//! Channel failures are logged and swallowed.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::{Notification, NotificationChannel, NotificationLevel, Notifier};
use crate::adapters::{EmailNotifier, FeishuNotifier, TelegramNotifier};
use crate::config::NotificationConfig;

/// Notification manager for coordinating channels
pub struct NotificationManager {
    channels: Vec<Arc<dyn NotificationChannel>>,
}

impl NotificationManager {
    /// Create a manager with no channels (log only)
    pub fn new() -> Self {
        Self {
            channels: Vec::new(),
        }
    }

    /// Build channels from configuration, disabling any with missing credentials
    pub fn from_config(config: &NotificationConfig) -> Self {
        let mut manager = Self::new();

        let telegram = &config.telegram;
        if telegram.enabled {
            match (&telegram.bot_token, &telegram.chat_id) {
                (Some(token), Some(chat_id)) if !token.is_empty() && !chat_id.is_empty() => {
                    manager = manager.with_channel(Arc::new(TelegramNotifier::new(
                        &telegram.api_base,
                        token.clone(),
                        chat_id.clone(),
                    )));
                    info!("Telegram notifications enabled");
                }
                _ => warn!("Telegram notifications enabled but missing credentials."),
            }
        }

        let webhook = &config.webhook;
        if webhook.enabled {
            match &webhook.url {
                Some(url) if !url.is_empty() => {
                    manager = manager.with_channel(Arc::new(FeishuNotifier::new(url.clone())));
                    info!("Webhook notifications enabled");
                }
                _ => warn!("Webhook notifications enabled but no URL configured."),
            }
        }

        let email = &config.email;
        if email.enabled {
            match (&email.sender, &email.password) {
                (Some(sender), Some(password))
                    if !sender.trim().is_empty()
                        && !password.is_empty()
                        && !email.recipients.trim().is_empty() =>
                {
                    match EmailNotifier::new(
                        &email.smtp_host,
                        email.smtp_port,
                        sender,
                        password,
                        &email.recipients,
                    ) {
                        Ok(notifier) => {
                            manager = manager.with_channel(Arc::new(notifier));
                            info!("Email notifications enabled");
                        }
                        Err(e) => error!("Failed to initialize email notifications: {}", e),
                    }
                }
                _ => warn!("Email notifications enabled but missing credentials."),
            }
        }

        manager
    }

    /// Add a delivery channel
    pub fn with_channel(mut self, channel: Arc<dyn NotificationChannel>) -> Self {
        self.channels.push(channel);
        self
    }

    pub fn channel_names(&self) -> Vec<&'static str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    pub async fn send(&self, notification: &Notification) {
        match notification.level {
            NotificationLevel::Error => error!(
                "Notification: {} - {}",
                notification.subject, notification.body
            ),
            NotificationLevel::Info | NotificationLevel::Success => info!(
                "Notification: {} - {}",
                notification.subject, notification.body
            ),
        }

        let text = notification.render();
        for channel in &self.channels {
            if let Err(e) = channel.deliver(&notification.subject, &text).await {
                error!("Failed to send {} notification: {}", channel.name(), e);
            }
        }
    }
}

impl Default for NotificationManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for NotificationManager {
    async fn notify(&self, notification: &Notification) {
        self.send(notification).await;
    }
}
