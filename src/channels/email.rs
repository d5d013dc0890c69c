//! SMTP email adapter built on lettre.

use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::EmailConfig;
use crate::notification::{Channel, OutboundMessage};

use super::{ChannelSender, TransportError};

pub struct SmtpEmailSender {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpEmailSender {
    /// Build the SMTP transport up front; relay and sender address are
    /// validated here so a misconfiguration fails at startup.
    pub fn new(config: &EmailConfig) -> anyhow::Result<Self> {
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.smtp_user.clone(),
                config.smtp_pass.clone(),
            ))
            .build();

        let from: Mailbox = config.from.parse()?;

        Ok(Self { mailer, from })
    }

    fn send_failed(reason: impl ToString) -> TransportError {
        TransportError::SendFailed {
            channel: Channel::Email,
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl ChannelSender for SmtpEmailSender {
    fn channel(&self) -> Channel {
        Channel::Email
    }

    async fn send(
        &self,
        recipient: &str,
        message: &OutboundMessage,
    ) -> Result<(), TransportError> {
        let to: Mailbox = recipient
            .parse()
            .map_err(|e| Self::send_failed(format!("invalid recipient address: {}", e)))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(&message.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(message.body.clone())
            .map_err(Self::send_failed)?;

        self.mailer.send(email).await.map_err(Self::send_failed)?;

        tracing::debug!(recipient = %recipient, "Email accepted by SMTP relay");
        Ok(())
    }
}
