//! SMTP email notifications
//!
//! Sends plain text mail over a STARTTLS relay (Gmail by default).

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

use crate::error::{AutobuyError, Result};
use crate::notify::NotificationChannel;

/// Email notification client
pub struct EmailNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Vec<Mailbox>,
}

impl EmailNotifier {
    /// `recipients` is a comma-separated address list; blank items are ignored.
    pub fn new(
        smtp_host: &str,
        smtp_port: u16,
        sender: &str,
        password: &str,
        recipients: &str,
    ) -> Result<Self> {
        let from = parse_mailbox(sender)?;
        let to = recipients
            .split(',')
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(parse_mailbox)
            .collect::<Result<Vec<_>>>()?;
        if to.is_empty() {
            return Err(AutobuyError::Notification("no email recipients".into()));
        }

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(smtp_host)
            .map_err(|e| AutobuyError::Notification(format!("SMTP relay {}: {}", smtp_host, e)))?
            .port(smtp_port)
            .credentials(Credentials::new(sender.to_string(), password.to_string()))
            .build();

        Ok(Self {
            transport,
            from,
            to,
        })
    }

    fn build_message(&self, subject: &str, text: &str) -> Result<Message> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(subject)
            .header(ContentType::TEXT_PLAIN);
        for mailbox in &self.to {
            builder = builder.to(mailbox.clone());
        }
        builder
            .body(text.to_string())
            .map_err(|e| AutobuyError::Notification(format!("invalid email: {}", e)))
    }
}

fn parse_mailbox(raw: &str) -> Result<Mailbox> {
    raw.trim()
        .parse::<Mailbox>()
        .map_err(|e| AutobuyError::Notification(format!("invalid email address '{}': {}", raw, e)))
}

#[async_trait]
impl NotificationChannel for EmailNotifier {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn deliver(&self, subject: &str, text: &str) -> Result<()> {
        let message = self.build_message(subject, text)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| AutobuyError::Notification(format!("SMTP send failed: {}", e)))?;
        info!("Email notification sent: {}", subject);
        Ok(())
    }
}
