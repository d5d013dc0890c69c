//! Notification domain: record types, creation, and dispatch.

mod dispatcher;
mod service;
mod types;

pub use dispatcher::{Dispatcher, DispatcherStats, DispatcherStatsSnapshot};
pub use service::{CreateNotificationRequest, NotificationService};
pub use types::{
    Channel, ChannelOutcome, ChannelSet, DispatchSummary, NewNotification, Notification,
    OutboundMessage, Status,
};
