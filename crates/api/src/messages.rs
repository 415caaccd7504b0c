//! `/admin/messages` endpoints.

use fly8_core::models::SendMessage;
use serde_json::Value;
use validator::Validate;

use crate::client::{unwrap_envelope, ApiClient};
use crate::error::ApiError;

impl ApiClient {
    /// `GET /admin/messages/conversations`. Returns the conversation array.
    pub async fn conversations(&self) -> Result<Value, ApiError> {
        let body = self.get("/admin/messages/conversations", &[]).await?;
        Ok(unwrap_envelope(body, "conversations"))
    }

    /// `GET /admin/messages/{conversation_id}`. Returns the paginated body.
    pub async fn conversation_messages(
        &self,
        conversation_id: &str,
        page: u32,
        limit: u32,
    ) -> Result<Value, ApiError> {
        self.get(
            &format!("/admin/messages/{conversation_id}"),
            &[("page", page.to_string()), ("limit", limit.to_string())],
        )
        .await
    }

    /// `POST /admin/messages/send`. The body is validated before sending.
    pub async fn send_message(&self, message: &SendMessage) -> Result<Value, ApiError> {
        message.validate()?;
        self.post("/admin/messages/send", message).await
    }

    /// `PUT /admin/messages/{id}/read`.
    pub async fn mark_message_read(&self, message_id: &str) -> Result<Value, ApiError> {
        self.put::<()>(&format!("/admin/messages/{message_id}/read"), None)
            .await
    }

    /// `GET /admin/messages/stats`.
    pub async fn message_stats(&self) -> Result<Value, ApiError> {
        let body = self.get("/admin/messages/stats", &[]).await?;
        Ok(unwrap_envelope(body, "stats"))
    }
}
