// Email notifications
// SMTP delivery of the messages built in `messages`

pub mod messages;

use crate::config::SmtpConfig;
use anyhow::{Context, Result};
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use std::time::Duration;

/// A ready to send message with plain text and HTML alternatives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub plain: String,
    pub html: String,
}

pub trait Notifier {
    fn send(&self, notification: &Notification) -> Result<()>;
}

pub struct SmtpNotifier {
    transport: SmtpTransport,
    from: Mailbox,
    to: Mailbox,
}

impl SmtpNotifier {
    pub fn new(config: &SmtpConfig, timeout: Duration) -> Result<Self> {
        let from: Mailbox = config
            .sender
            .parse()
            .with_context(|| format!("Invalid sender address: {}", config.sender))?;
        let to: Mailbox = config
            .receiver
            .parse()
            .with_context(|| format!("Invalid receiver address: {}", config.receiver))?;

        let builder = if config.starttls {
            SmtpTransport::starttls_relay(&config.host)
                .with_context(|| format!("Failed to set up STARTTLS for {}", config.host))?
        } else {
            SmtpTransport::builder_dangerous(&config.host)
        };

        let mut builder = builder.port(config.port).timeout(Some(timeout));
        if !config.user.is_empty() {
            builder = builder
                .credentials(Credentials::new(config.user.clone(), config.password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
            to,
        })
    }
}

impl Notifier for SmtpNotifier {
    fn send(&self, notification: &Notification) -> Result<()> {
        let email = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(notification.subject.clone())
            .multipart(MultiPart::alternative_plain_html(
                notification.plain.clone(),
                notification.html.clone(),
            ))
            .context("Failed to build email")?;

        self.transport.send(&email).context("Failed to send email")?;
        log::debug!("Email sent: {}", notification.subject);
        Ok(())
    }
}
