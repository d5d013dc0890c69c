//! Notification creation and queries.

use std::sync::Arc;

use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::metrics::NOTIFICATIONS_CREATED_TOTAL;
use crate::store::{NotificationStore, Page};

use super::{Channel, NewNotification, Notification};

/// Creation request, shared by the HTTP surface and the queue intake.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateNotificationRequest {
    /// Subject line
    #[validate(length(min = 1, message = "affair must not be blank"))]
    pub affair: String,
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    #[validate(length(min = 1, message = "body must not be blank"))]
    pub body: String,
    /// Recipient phone number
    #[validate(length(min = 1, message = "number must not be blank"))]
    pub number: String,
}

/// Creation and read operations over the store.
///
/// `create` performs exactly one persistence write and never dispatches;
/// scheduling is a separate call on the dispatcher.
pub struct NotificationService {
    store: Arc<dyn NotificationStore>,
}

impl NotificationService {
    pub fn new(store: Arc<dyn NotificationStore>) -> Self {
        Self { store }
    }

    #[tracing::instrument(name = "notification.create", skip(self, request))]
    pub async fn create(&self, request: CreateNotificationRequest) -> Result<Notification> {
        request
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        // length(min = 1) accepts whitespace-only values; blank means blank
        for (field, value) in [
            ("affair", &request.affair),
            ("email", &request.email),
            ("body", &request.body),
            ("number", &request.number),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::Validation(format!("{} must not be blank", field)));
            }
        }

        let new = NewNotification::pending(
            request.affair.trim().to_string(),
            request.email.trim().to_string(),
            request.body.trim().to_string(),
            request.number.trim().to_string(),
        );

        let record = self.store.insert(new).await?;
        NOTIFICATIONS_CREATED_TOTAL.inc();
        tracing::info!(notification_id = %record.id, "Notification created");

        Ok(record)
    }

    pub async fn get(&self, id: Uuid) -> Result<Notification> {
        Ok(self.store.find_by_id(id).await?)
    }

    pub async fn list(&self, page: usize, size: usize) -> Result<Page<Notification>> {
        Ok(self.store.list(page, size).await?)
    }

    /// The supported channel names.
    pub fn channels(&self) -> Vec<Channel> {
        Channel::ALL.to_vec()
    }
}
