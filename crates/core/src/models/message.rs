use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::person::{EntityRef, PersonSummary};
use crate::types::{EntityId, Timestamp};

/// Upper bound on a single chat message body.
pub const MAX_MESSAGE_LENGTH: u64 = 5000;

/// Delivery state of a chat message. Server-authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Sent,
    Delivered,
    Read,
}

/// One chat message inside a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(rename = "_id")]
    pub id: EntityId,
    pub conversation_id: EntityId,
    pub sender: EntityRef,
    pub recipient: EntityRef,
    #[serde(default)]
    pub content: String,
    pub status: MessageStatus,
    pub created_at: Timestamp,
}

/// Conversation summary as returned by the conversations endpoint.
///
/// `unread_count` comes straight from the server; read state is never
/// recomputed client-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub conversation_id: EntityId,
    #[serde(alias = "student")]
    pub counterpart: PersonSummary,
    #[serde(default)]
    pub last_message: Option<Message>,
    #[serde(default)]
    pub unread_count: u32,
}

impl Conversation {
    /// Timestamp used to order the conversation list.
    pub fn last_activity(&self) -> Option<Timestamp> {
        self.last_message.as_ref().map(|m| m.created_at)
    }
}

/// Body for the send-message mutation.
#[derive(Debug, Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendMessage {
    #[validate(length(min = 1))]
    pub student_id: EntityId,
    #[validate(length(min = 1, max = 5000))]
    pub content: String,
}
