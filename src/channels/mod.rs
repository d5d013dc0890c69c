//! Channel transport adapters.
//!
//! Each delivery medium is a [`ChannelSender`]: a single `send(recipient,
//! message)` operation over one protocol. Adapters are constructed once at
//! startup from settings; a channel with no credentials configured falls
//! back to a log-only adapter so the dispatch pipeline stays exercisable
//! without external accounts.

mod email;
mod sms;
mod whatsapp;

pub use email::SmtpEmailSender;
pub use sms::TwilioSmsSender;
pub use whatsapp::WhatsAppSender;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::ChannelsConfig;
use crate::notification::{Channel, OutboundMessage};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("{channel} send failed: {reason}")]
    SendFailed { channel: Channel, reason: String },

    #[error("{channel} provider rejected the request with status {status}: {body}")]
    ProviderRejected {
        channel: Channel,
        status: u16,
        body: String,
    },

    #[error("{channel} send timed out after {seconds}s")]
    Timeout { channel: Channel, seconds: u64 },
}

/// A transport adapter for one delivery medium.
#[async_trait]
pub trait ChannelSender: Send + Sync {
    /// The channel this adapter serves.
    fn channel(&self) -> Channel;

    /// Deliver one message to one recipient.
    async fn send(&self, recipient: &str, message: &OutboundMessage)
        -> Result<(), TransportError>;
}

/// Adapter that records the send via tracing without touching the network.
///
/// Stands in for any channel whose credentials are absent.
pub struct LogOnlySender {
    channel: Channel,
}

impl LogOnlySender {
    pub fn new(channel: Channel) -> Self {
        Self { channel }
    }
}

#[async_trait]
impl ChannelSender for LogOnlySender {
    fn channel(&self) -> Channel {
        self.channel
    }

    async fn send(
        &self,
        recipient: &str,
        message: &OutboundMessage,
    ) -> Result<(), TransportError> {
        tracing::info!(
            channel = %self.channel,
            recipient = %recipient,
            subject = %message.subject,
            "Log-only channel send"
        );
        Ok(())
    }
}

/// Build one sender per supported channel from settings.
///
/// Adapters are fully initialized here, before any traffic reaches them;
/// there is no lazy first-use setup.
pub fn create_senders(config: &ChannelsConfig) -> Vec<Arc<dyn ChannelSender>> {
    let email: Arc<dyn ChannelSender> = match &config.email {
        Some(cfg) => match SmtpEmailSender::new(cfg) {
            Ok(sender) => {
                tracing::info!(host = %cfg.smtp_host, "Creating SMTP email sender");
                Arc::new(sender)
            }
            Err(e) => {
                tracing::warn!(error = %e, "SMTP setup failed, falling back to log-only email sender");
                Arc::new(LogOnlySender::new(Channel::Email))
            }
        },
        None => {
            tracing::info!("No SMTP credentials configured, using log-only email sender");
            Arc::new(LogOnlySender::new(Channel::Email))
        }
    };

    let sms: Arc<dyn ChannelSender> = match &config.sms {
        Some(cfg) => {
            tracing::info!("Creating Twilio SMS sender");
            Arc::new(TwilioSmsSender::new(cfg))
        }
        None => {
            tracing::info!("No Twilio credentials configured, using log-only SMS sender");
            Arc::new(LogOnlySender::new(Channel::Sms))
        }
    };

    let whatsapp: Arc<dyn ChannelSender> = match &config.whatsapp {
        Some(cfg) => {
            tracing::info!(api_url = %cfg.api_url, "Creating WhatsApp sender");
            Arc::new(WhatsAppSender::new(cfg))
        }
        None => {
            tracing::info!("No WhatsApp credentials configured, using log-only WhatsApp sender");
            Arc::new(LogOnlySender::new(Channel::Whatsapp))
        }
    };

    vec![email, sms, whatsapp]
}
