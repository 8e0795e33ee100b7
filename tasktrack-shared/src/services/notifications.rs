/// Notification service
///
/// Owns the per-user inbox. Ownership is enforced here: a user can only ever
/// read or mark their own notifications.

use crate::error::{ServiceError, ServiceResult};
use crate::models::notification::{NewNotification, Notification};
use crate::store::Store;
use std::sync::Arc;
use uuid::Uuid;

/// A user's notifications plus their unread total
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Inbox {
    pub notifications: Vec<Notification>,
    pub unread_count: i64,
}

#[derive(Clone)]
pub struct NotificationService {
    store: Arc<dyn Store>,
}

impl NotificationService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Appends one unread notification
    pub async fn create(
        &self,
        user_id: Uuid,
        message: impl Into<String>,
        task_id: Option<Uuid>,
    ) -> ServiceResult<Notification> {
        let notification = self
            .store
            .create_notification(NewNotification {
                user_id,
                message: message.into(),
                task_id,
            })
            .await?;

        tracing::debug!(
            notification_id = %notification.id,
            user_id = %user_id,
            "Notification created"
        );

        Ok(notification)
    }

    /// Up to 50 most recent notifications, newest first
    pub async fn list_for_user(&self, user_id: Uuid) -> ServiceResult<Vec<Notification>> {
        Ok(self.store.list_notifications(user_id).await?)
    }

    pub async fn unread_count(&self, user_id: Uuid) -> ServiceResult<i64> {
        Ok(self.store.unread_notifications(user_id).await?)
    }

    /// Listing and unread count fetched concurrently
    pub async fn inbox(&self, user_id: Uuid) -> ServiceResult<Inbox> {
        let (notifications, unread_count) =
            tokio::try_join!(self.list_for_user(user_id), self.unread_count(user_id))?;

        Ok(Inbox {
            notifications,
            unread_count,
        })
    }

    /// Marks one of the user's notifications read
    ///
    /// # Errors
    ///
    /// `NotFound` if the notification doesn't exist or belongs to someone else.
    pub async fn mark_read(&self, notification_id: Uuid, user_id: Uuid) -> ServiceResult<Notification> {
        self.store
            .mark_notification_read(notification_id, user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Notification not found".to_string()))
    }

    /// Marks every unread notification of the user read; returns how many changed
    pub async fn mark_all_read(&self, user_id: Uuid) -> ServiceResult<u64> {
        let changed = self.store.mark_all_notifications_read(user_id).await?;
        tracing::debug!(user_id = %user_id, changed, "Marked notifications read");
        Ok(changed)
    }
}
