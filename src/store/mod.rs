//! Persistence layer for notification records.
//!
//! The store is the single shared mutable resource and serves as the
//! linearization point for the `Pending -> Sent` transition: `mark_sent`
//! succeeds at most once per record, so concurrent dispatchers cannot both
//! claim the same record.

mod factory;
mod memory;
mod postgres;

pub use factory::create_store;
pub use memory::MemoryNotificationStore;
pub use postgres::PostgresNotificationStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::notification::{NewNotification, Notification};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("notification {0} not found")]
    NotFound(Uuid),

    /// The record was already `Sent` when a transition was attempted
    #[error("notification {0} already processed")]
    AlreadyProcessed(Uuid),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// One page of records, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub size: usize,
    pub total: u64,
}

/// Storage backend for notification records.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Persist a new record; the store assigns the id.
    async fn insert(&self, new: NewNotification) -> Result<Notification, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Notification, StoreError>;

    /// Records ordered by creation time descending.
    async fn list(&self, page: usize, size: usize) -> Result<Page<Notification>, StoreError>;

    /// Conditionally transition `Pending -> Sent`, stamping `send_at`.
    ///
    /// Fails with [`StoreError::AlreadyProcessed`] if the record is no
    /// longer `Pending`; the check and the write are atomic per record.
    async fn mark_sent(
        &self,
        id: Uuid,
        send_at: DateTime<Utc>,
    ) -> Result<Notification, StoreError>;
}
