//! Twilio SMS adapter.
//!
//! Posts to the Twilio Messages REST API with basic auth. SMS carries the
//! subject and body concatenated into one text.

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::SmsConfig;
use crate::notification::{Channel, OutboundMessage};

use super::{ChannelSender, TransportError};

const TWILIO_API_BASE: &str = "https://api.twilio.com";

pub struct TwilioSmsSender {
    client: reqwest::Client,
    account_sid: String,
    auth_token: String,
    from_number: String,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct TwilioErrorBody {
    message: Option<String>,
}

impl TwilioSmsSender {
    pub fn new(config: &SmsConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
            from_number: config.from_number.clone(),
            api_base: config
                .api_url
                .clone()
                .unwrap_or_else(|| TWILIO_API_BASE.to_string()),
        }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base, self.account_sid
        )
    }
}

#[async_trait]
impl ChannelSender for TwilioSmsSender {
    fn channel(&self) -> Channel {
        Channel::Sms
    }

    async fn send(
        &self,
        recipient: &str,
        message: &OutboundMessage,
    ) -> Result<(), TransportError> {
        let params = [
            ("To", recipient),
            ("From", self.from_number.as_str()),
            ("Body", &message.as_text()),
        ];

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&params)
            .send()
            .await
            .map_err(|e| TransportError::SendFailed {
                channel: Channel::Sms,
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .json::<TwilioErrorBody>()
                .await
                .ok()
                .and_then(|b| b.message)
                .unwrap_or_else(|| "no error detail".to_string());

            return Err(TransportError::ProviderRejected {
                channel: Channel::Sms,
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(recipient = %recipient, "SMS accepted by Twilio");
        Ok(())
    }
}
