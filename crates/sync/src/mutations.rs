//! Dashboard mutations.
//!
//! Each mutation calls the backend and, only on success, invalidates the
//! cache prefixes it affects. Failures are returned to the caller with
//! the cache untouched.

use std::sync::Arc;

use fly8_api::ApiClient;
use fly8_cache::{QueryPrefix, QueryStore};
use fly8_core::models::{SendMessage, StudentStatusUpdate};
use serde_json::Value;
use validator::Validate;

use crate::error::SyncError;
use crate::keys;

#[derive(Clone)]
pub struct Mutations {
    api: Arc<ApiClient>,
    store: QueryStore,
}

impl Mutations {
    pub fn new(api: Arc<ApiClient>, store: QueryStore) -> Self {
        Self { api, store }
    }

    /// Send a chat message to a student.
    ///
    /// The content is trimmed and must be 1..=5000 characters.
    pub async fn send_message(&self, student_id: &str, content: &str) -> Result<Value, SyncError> {
        let request = SendMessage {
            student_id: student_id.to_string(),
            content: content.trim().to_string(),
        };
        request.validate()?;

        let body = self.api.send_message(&request).await?;

        let conversation_id = body
            .get("message")
            .and_then(|m| m.get("conversationId"))
            .or_else(|| body.get("conversationId"))
            .and_then(Value::as_str)
            .map(str::to_string);
        self.invalidate_messages(conversation_id);
        Ok(body)
    }

    pub async fn mark_message_read(
        &self,
        message_id: &str,
        conversation_id: Option<&str>,
    ) -> Result<Value, SyncError> {
        let body = self.api.mark_message_read(message_id).await?;
        self.invalidate_messages(conversation_id.map(str::to_string));
        Ok(body)
    }

    pub async fn mark_notification_read(&self, id: &str) -> Result<Value, SyncError> {
        let body = self.api.mark_notification_read(id).await?;
        self.invalidate_notifications();
        Ok(body)
    }

    pub async fn mark_all_notifications_read(&self) -> Result<Value, SyncError> {
        let body = self.api.mark_all_notifications_read().await?;
        self.invalidate_notifications();
        Ok(body)
    }

    pub async fn delete_notification(&self, id: &str) -> Result<Value, SyncError> {
        let body = self.api.delete_notification(id).await?;
        self.invalidate_notifications();
        Ok(body)
    }

    pub async fn update_student_status(
        &self,
        student_id: &str,
        update: &StudentStatusUpdate,
    ) -> Result<Value, SyncError> {
        if update.active.is_none() && update.approved.is_none() {
            return Err(SyncError::Validation("status update has no fields".into()));
        }

        let body = self.api.update_student_status(student_id, update).await?;
        self.invalidate(&[
            QueryPrefix::kind(keys::STUDENTS),
            QueryPrefix::kind(keys::STUDENT_STATS),
            QueryPrefix::kind(keys::STUDENT).with_id(student_id),
        ]);
        Ok(body)
    }

    // ---- private helpers ----

    fn invalidate_messages(&self, conversation_id: Option<String>) {
        let thread = match conversation_id {
            Some(id) => QueryPrefix::kind(keys::MESSAGES).with_id(id),
            None => QueryPrefix::kind(keys::MESSAGES),
        };
        self.invalidate(&[
            thread,
            QueryPrefix::kind(keys::CONVERSATIONS),
            QueryPrefix::kind(keys::MESSAGE_STATS),
        ]);
    }

    fn invalidate_notifications(&self) {
        self.invalidate(&[
            QueryPrefix::kind(keys::NOTIFICATIONS),
            QueryPrefix::kind(keys::NOTIFICATION_STATS),
        ]);
    }

    fn invalidate(&self, prefixes: &[QueryPrefix]) {
        for prefix in prefixes {
            self.store.invalidate(prefix);
        }
    }
}
