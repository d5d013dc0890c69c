mod settings;

pub use settings::{
    ChannelsConfig, EmailConfig, JwtConfig, QueueConfig, ServerConfig, Settings, SmsConfig,
    StoreConfig, WhatsAppConfig,
};
