//! PostgreSQL store backend.
//!
//! The `Pending -> Sent` transition is a conditional `UPDATE ... WHERE
//! status = 'PENDING'`, so the database row is the linearization point:
//! of two concurrent dispatchers, exactly one sees a row updated.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::notification::{ChannelSet, NewNotification, Notification, Status};

use super::{NotificationStore, Page, StoreError};

pub struct PostgresNotificationStore {
    pool: PgPool,
}

/// `OFFSET` for a page, clamped so oversized query params cannot overflow
/// into a negative offset.
fn page_offset(page: usize, size: usize) -> i64 {
    i64::try_from(page.saturating_mul(size)).unwrap_or(i64::MAX)
}

impl PostgresNotificationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the notifications table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS notifications (
                id          UUID PRIMARY KEY,
                affair      TEXT NOT NULL,
                body        TEXT NOT NULL,
                email       TEXT NOT NULL,
                number      TEXT NOT NULL,
                channels    TEXT NOT NULL,
                status      TEXT NOT NULL,
                created_at  TIMESTAMPTZ NOT NULL,
                send_at     TIMESTAMPTZ
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_notifications_created_at \
             ON notifications (created_at DESC)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn row_to_notification(row: &PgRow) -> Result<Notification, sqlx::Error> {
        let channels: String = row.try_get("channels")?;
        let status: String = row.try_get("status")?;

        Ok(Notification {
            id: row.try_get("id")?,
            affair: row.try_get("affair")?,
            body: row.try_get("body")?,
            email: row.try_get("email")?,
            number: row.try_get("number")?,
            channels: channels.parse::<ChannelSet>().unwrap_or_default(),
            status: status
                .parse::<Status>()
                .map_err(|e| sqlx::Error::Decode(e.into()))?,
            created_at: row.try_get("created_at")?,
            send_at: row.try_get("send_at")?,
        })
    }
}

#[async_trait]
impl NotificationStore for PostgresNotificationStore {
    async fn insert(&self, new: NewNotification) -> Result<Notification, StoreError> {
        let id = Uuid::new_v4();
        let record = new.into_notification(id);

        sqlx::query(
            r#"
            INSERT INTO notifications
                (id, affair, body, email, number, channels, status, created_at, send_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NULL)
            "#,
        )
        .bind(record.id)
        .bind(&record.affair)
        .bind(&record.body)
        .bind(&record.email)
        .bind(&record.number)
        .bind(record.channels.to_string())
        .bind(record.status.as_str())
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        Ok(record)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Notification, StoreError> {
        let row = sqlx::query("SELECT * FROM notifications WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound(id))?;

        Ok(Self::row_to_notification(&row)?)
    }

    async fn list(&self, page: usize, size: usize) -> Result<Page<Notification>, StoreError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notifications")
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query(
            "SELECT * FROM notifications \
             ORDER BY created_at DESC, id DESC \
             LIMIT $1 OFFSET $2",
        )
        .bind(i64::try_from(size).unwrap_or(i64::MAX))
        .bind(page_offset(page, size))
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .iter()
            .map(Self::row_to_notification)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page {
            items,
            page,
            size,
            total: total as u64,
        })
    }

    async fn mark_sent(
        &self,
        id: Uuid,
        send_at: DateTime<Utc>,
    ) -> Result<Notification, StoreError> {
        let updated = sqlx::query(
            "UPDATE notifications \
             SET status = 'SENT', send_at = $2 \
             WHERE id = $1 AND status = 'PENDING' \
             RETURNING *",
        )
        .bind(id)
        .bind(send_at)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(row) => Ok(Self::row_to_notification(&row)?),
            // Nothing updated: either the record is gone or already sent
            None => match self.find_by_id(id).await {
                Ok(_) => Err(StoreError::AlreadyProcessed(id)),
                Err(StoreError::NotFound(_)) => Err(StoreError::NotFound(id)),
                Err(e) => Err(e),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_offset_handles_normal_pages() {
        assert_eq!(page_offset(0, 10), 0);
        assert_eq!(page_offset(3, 10), 30);
    }

    #[test]
    fn page_offset_clamps_instead_of_overflowing() {
        assert_eq!(page_offset(usize::MAX, usize::MAX), i64::MAX);
        assert_eq!(page_offset(usize::MAX, 2), i64::MAX);
        // A zero-sized page never produces a negative or huge offset
        assert_eq!(page_offset(usize::MAX, 0), 0);
    }
}
