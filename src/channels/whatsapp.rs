//! WhatsApp Cloud API adapter.
//!
//! Posts a text message to the Cloud API with a bearer token. Like SMS,
//! WhatsApp carries the subject and body as one concatenated text.

use async_trait::async_trait;
use serde_json::json;

use crate::config::WhatsAppConfig;
use crate::notification::{Channel, OutboundMessage};

use super::{ChannelSender, TransportError};

pub struct WhatsAppSender {
    client: reqwest::Client,
    api_url: String,
    access_token: String,
}

impl WhatsAppSender {
    pub fn new(config: &WhatsAppConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.clone(),
            access_token: config.access_token.clone(),
        }
    }
}

#[async_trait]
impl ChannelSender for WhatsAppSender {
    fn channel(&self) -> Channel {
        Channel::Whatsapp
    }

    async fn send(
        &self,
        recipient: &str,
        message: &OutboundMessage,
    ) -> Result<(), TransportError> {
        let payload = json!({
            "messaging_product": "whatsapp",
            "to": recipient,
            "type": "text",
            "text": { "body": message.as_text() },
        });

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.access_token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| TransportError::SendFailed {
                channel: Channel::Whatsapp,
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::ProviderRejected {
                channel: Channel::Whatsapp,
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(recipient = %recipient, "Message accepted by WhatsApp Cloud API");
        Ok(())
    }
}
