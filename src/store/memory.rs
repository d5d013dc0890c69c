//! In-memory store backend backed by `DashMap`.
//!
//! Default backend for development and tests. `mark_sent` mutates through
//! the map's entry guard, which holds the shard lock for the duration of
//! the check-and-set, making the status transition atomic per record.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::notification::{NewNotification, Notification, Status};

use super::{NotificationStore, Page, StoreError};

#[derive(Default)]
pub struct MemoryNotificationStore {
    records: DashMap<Uuid, Notification>,
}

impl MemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl NotificationStore for MemoryNotificationStore {
    async fn insert(&self, new: NewNotification) -> Result<Notification, StoreError> {
        let id = Uuid::new_v4();
        let record = new.into_notification(id);
        self.records.insert(id, record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Notification, StoreError> {
        self.records
            .get(&id)
            .map(|r| r.clone())
            .ok_or(StoreError::NotFound(id))
    }

    async fn list(&self, page: usize, size: usize) -> Result<Page<Notification>, StoreError> {
        let mut items: Vec<Notification> =
            self.records.iter().map(|r| r.value().clone()).collect();
        let total = items.len() as u64;

        // Newest first; id as tie-breaker for a stable order
        items.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        let items = items
            .into_iter()
            .skip(page.saturating_mul(size))
            .take(size)
            .collect();

        Ok(Page {
            items,
            page,
            size,
            total,
        })
    }

    async fn mark_sent(
        &self,
        id: Uuid,
        send_at: DateTime<Utc>,
    ) -> Result<Notification, StoreError> {
        let mut entry = self.records.get_mut(&id).ok_or(StoreError::NotFound(id))?;

        if entry.status != Status::Pending {
            return Err(StoreError::AlreadyProcessed(id));
        }

        entry.status = Status::Sent;
        entry.send_at = Some(send_at);
        Ok(entry.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample(affair: &str) -> NewNotification {
        NewNotification::pending(
            affair.to_string(),
            "a@b.com".to_string(),
            "body".to_string(),
            "+10000000".to_string(),
        )
    }

    #[tokio::test]
    async fn insert_assigns_id_and_keeps_pending() {
        let store = MemoryNotificationStore::new();
        let record = store.insert(sample("Invoice")).await.unwrap();

        assert_eq!(record.status, Status::Pending);
        assert!(record.send_at.is_none());

        let found = store.find_by_id(record.id).await.unwrap();
        assert_eq!(found.id, record.id);
        assert_eq!(found.affair, "Invoice");
    }

    #[tokio::test]
    async fn find_unknown_id_is_not_found() {
        let store = MemoryNotificationStore::new();
        let err = store.find_by_id(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn mark_sent_transitions_once() {
        let store = MemoryNotificationStore::new();
        let record = store.insert(sample("Invoice")).await.unwrap();

        let sent = store.mark_sent(record.id, Utc::now()).await.unwrap();
        assert_eq!(sent.status, Status::Sent);
        assert!(sent.send_at.is_some());

        let err = store.mark_sent(record.id, Utc::now()).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyProcessed(_)));
    }

    #[tokio::test]
    async fn mark_sent_unknown_id_is_not_found() {
        let store = MemoryNotificationStore::new();
        let err = store.mark_sent(Uuid::new_v4(), Utc::now()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn list_orders_newest_first_and_paginates() {
        let store = MemoryNotificationStore::new();

        let base = Utc::now();
        for i in 0..15 {
            let mut new = sample(&format!("n-{}", i));
            new.created_at = base + Duration::seconds(i);
            store.insert(new).await.unwrap();
        }

        let first = store.list(0, 10).await.unwrap();
        assert_eq!(first.items.len(), 10);
        assert_eq!(first.total, 15);
        assert_eq!(first.items[0].affair, "n-14");

        let second = store.list(1, 10).await.unwrap();
        assert_eq!(second.items.len(), 5);
        assert_eq!(second.items[4].affair, "n-0");

        let past_end = store.list(5, 10).await.unwrap();
        assert!(past_end.items.is_empty());
    }
}
