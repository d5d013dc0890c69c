use std::sync::Arc;
use std::time::Duration;

use crate::auth::JwtValidator;
use crate::channels::ChannelSender;
use crate::config::Settings;
use crate::notification::{Dispatcher, NotificationService};
use crate::store::NotificationStore;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub jwt_validator: Arc<JwtValidator>,
    pub service: Arc<NotificationService>,
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    pub fn new(
        settings: Settings,
        store: Arc<dyn NotificationStore>,
        senders: Vec<Arc<dyn ChannelSender>>,
    ) -> Self {
        let jwt_validator = Arc::new(JwtValidator::new(&settings.jwt));
        let service = Arc::new(NotificationService::new(store.clone()));
        let dispatcher = Arc::new(Dispatcher::new(
            store,
            senders,
            Duration::from_secs(settings.channels.send_timeout_seconds),
        ));

        Self {
            settings: Arc::new(settings),
            jwt_validator,
            service,
            dispatcher,
        }
    }
}
