//! Outbound control messages sent over the event channel.
//!
//! None of these carry an acknowledgment contract.

use fly8_core::types::EntityId;
use serde_json::json;

use crate::frame::Frame;
use crate::names;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMessage {
    /// Route subsequent events for `user_id` to this session.
    Join { user_id: EntityId },

    /// Subscribe to room-scoped delivery for one conversation.
    JoinConversation { conversation_id: EntityId },

    LeaveConversation { conversation_id: EntityId },

    /// Ephemeral presence signal; no persistence, no delivery guarantee.
    Typing {
        conversation_id: EntityId,
        user_id: EntityId,
        user_name: String,
    },

    StopTyping {
        conversation_id: EntityId,
        user_id: EntityId,
    },
}

impl ControlMessage {
    /// Encode as a wire frame.
    pub fn to_frame(&self) -> Frame {
        match self {
            ControlMessage::Join { user_id } => Frame::new(names::JOIN, json!(user_id)),
            ControlMessage::JoinConversation { conversation_id } => {
                Frame::new(names::JOIN_CONVERSATION, json!(conversation_id))
            }
            ControlMessage::LeaveConversation { conversation_id } => {
                Frame::new(names::LEAVE_CONVERSATION, json!(conversation_id))
            }
            ControlMessage::Typing {
                conversation_id,
                user_id,
                user_name,
            } => Frame::new(
                names::TYPING,
                json!({
                    "conversationId": conversation_id,
                    "userId": user_id,
                    "userName": user_name,
                }),
            ),
            ControlMessage::StopTyping {
                conversation_id,
                user_id,
            } => Frame::new(
                names::STOP_TYPING,
                json!({
                    "conversationId": conversation_id,
                    "userId": user_id,
                }),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_carries_bare_user_id() {
        let frame = ControlMessage::Join {
            user_id: "admin-1".into(),
        }
        .to_frame();
        assert_eq!(frame.event, "join");
        assert_eq!(frame.data, json!("admin-1"));
    }

    #[test]
    fn typing_uses_camel_case_fields() {
        let frame = ControlMessage::Typing {
            conversation_id: "c1".into(),
            user_id: "admin-1".into(),
            user_name: "Grace".into(),
        }
        .to_frame();
        assert_eq!(frame.event, "typing");
        assert_eq!(frame.data["conversationId"], "c1");
        assert_eq!(frame.data["userName"], "Grace");
    }

    #[test]
    fn stop_typing_omits_user_name() {
        let frame = ControlMessage::StopTyping {
            conversation_id: "c1".into(),
            user_id: "admin-1".into(),
        }
        .to_frame();
        assert_eq!(frame.event, "stop-typing");
        assert!(frame.data.get("userName").is_none());
    }
}
