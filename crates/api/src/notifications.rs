//! `/admin/notifications` endpoints.

use fly8_core::models::{NotificationStatus, NotificationType};
use serde_json::Value;

use crate::client::{unwrap_envelope, ApiClient};
use crate::error::ApiError;

/// Query parameters for the notification list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationFilters {
    pub page: u32,
    pub limit: u32,
    pub status: Option<NotificationStatus>,
    pub kind: Option<NotificationType>,
}

impl Default for NotificationFilters {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 20,
            status: None,
            kind: None,
        }
    }
}

impl NotificationFilters {
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![("page", self.page.to_string()), ("limit", self.limit.to_string())];
        if let Some(status) = self.status {
            query.push(("status", status.as_str().to_string()));
        }
        if let Some(kind) = self.kind {
            query.push(("type", kind.as_str().to_string()));
        }
        query
    }
}

impl ApiClient {
    /// `GET /admin/notifications`. Returns the paginated body.
    pub async fn notifications(&self, filters: &NotificationFilters) -> Result<Value, ApiError> {
        self.get("/admin/notifications", &filters.to_query()).await
    }

    /// `GET /admin/notifications/stats`.
    pub async fn notification_stats(&self) -> Result<Value, ApiError> {
        let body = self.get("/admin/notifications/stats", &[]).await?;
        Ok(unwrap_envelope(body, "stats"))
    }

    /// `PUT /admin/notifications/{id}/read`.
    pub async fn mark_notification_read(&self, id: &str) -> Result<Value, ApiError> {
        self.put::<()>(&format!("/admin/notifications/{id}/read"), None)
            .await
    }

    /// `PUT /admin/notifications/mark-all-read`.
    pub async fn mark_all_notifications_read(&self) -> Result<Value, ApiError> {
        self.put::<()>("/admin/notifications/mark-all-read", None)
            .await
    }

    /// `DELETE /admin/notifications/{id}`.
    pub async fn delete_notification(&self, id: &str) -> Result<Value, ApiError> {
        self.delete(&format!("/admin/notifications/{id}")).await
    }
}
