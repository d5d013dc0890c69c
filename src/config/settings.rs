use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub channels: ChannelsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Backend selector: "memory" (default) or "postgres"
    #[serde(default = "default_store_backend")]
    pub backend: String,
    pub postgres_url: Option<String>,
}

/// Queue intake configuration (Redis stream + consumer group).
#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    /// Stream the upstream messaging service appends creation requests to
    #[serde(default = "default_stream")]
    pub stream: String,
    #[serde(default = "default_group")]
    pub group: String,
    #[serde(default = "default_consumer")]
    pub consumer: String,
    /// Stream rejected entries are copied to before acknowledgment
    #[serde(default = "default_dead_letter_stream")]
    pub dead_letter_stream: String,
    /// XREADGROUP block timeout in milliseconds
    #[serde(default = "default_block_ms")]
    pub block_ms: u64,
    /// Maximum entries fetched per read
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ChannelsConfig {
    /// Per-adapter send timeout in seconds
    #[serde(default = "default_send_timeout")]
    pub send_timeout_seconds: u64,
    #[serde(default)]
    pub email: Option<EmailConfig>,
    #[serde(default)]
    pub sms: Option<SmsConfig>,
    #[serde(default)]
    pub whatsapp: Option<WhatsAppConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub smtp_user: String,
    pub smtp_pass: String,
    pub from: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmsConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    /// Override for the Twilio API base URL (primarily for testing)
    pub api_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WhatsAppConfig {
    pub api_url: String,
    pub access_token: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8082
}

fn default_smtp_port() -> u16 {
    587
}

fn default_store_backend() -> String {
    "memory".to_string()
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_stream() -> String {
    "messaging.user.notify".to_string()
}

fn default_group() -> String {
    "notification-service".to_string()
}

fn default_consumer() -> String {
    "consumer-1".to_string()
}

fn default_dead_letter_stream() -> String {
    "messaging.user.notify.dead".to_string()
}

fn default_block_ms() -> u64 {
    5_000
}

fn default_batch_size() -> usize {
    10
}

fn default_send_timeout() -> u64 {
    15
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8082)?
            .set_default("store.backend", "memory")?
            .set_default("queue.enabled", false)?
            .set_default("queue.redis_url", "redis://localhost:6379")?
            .set_default("channels.send_timeout_seconds", 15)?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Load from environment variables
            // SERVER_HOST, SERVER_PORT, JWT_SECRET, QUEUE_REDIS_URL, etc.
            .add_source(
                Environment::default()
                    .separator("_")
                    .try_parsing(true)
                    .list_separator(","),
            );

        builder.build()?.try_deserialize()
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            postgres_url: None,
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            redis_url: default_redis_url(),
            stream: default_stream(),
            group: default_group(),
            consumer: default_consumer(),
            dead_letter_stream: default_dead_letter_stream(),
            block_ms: default_block_ms(),
            batch_size: default_batch_size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let server = ServerConfig::default();
        assert_eq!(server.host, "0.0.0.0");
        assert_eq!(server.port, 8082);

        let queue = QueueConfig::default();
        assert!(!queue.enabled);
        assert_eq!(queue.stream, "messaging.user.notify");
        assert_eq!(queue.group, "notification-service");
    }

    #[test]
    fn test_store_defaults_to_memory() {
        let store = StoreConfig::default();
        assert_eq!(store.backend, "memory");
        assert!(store.postgres_url.is_none());
    }
}
