//! Inbound domain events.
//!
//! The server guarantees nothing about payload shape beyond the event
//! name. [`DomainEvent::kind`] decodes the known names into
//! [`KnownEvent`], where every identifying field is optional; consumers
//! pattern-match on what is present instead of assuming a schema.

use chrono::Utc;
use fly8_core::types::{EntityId, Timestamp};
use serde::{Deserialize, Serialize};

use crate::names;

/// A server-pushed notification of a state change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Wire name, e.g. `"message_received"`.
    pub name: String,

    /// Best-effort JSON payload. Never schema-validated.
    pub payload: serde_json::Value,

    /// When the client received the event (UTC).
    pub received_at: Timestamp,
}

/// Decoded view of a [`DomainEvent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KnownEvent {
    StudentUpdated { student_id: Option<EntityId> },
    MessageReceived { conversation_id: Option<EntityId> },
    MessageDelivered { conversation_id: Option<EntityId> },
    AppointmentUpdated,
    NotificationSent,
    DocumentUpdated { student_id: Option<EntityId> },
    Unknown,
}

impl DomainEvent {
    /// Create an event with an empty object payload.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: serde_json::Value::Object(Default::default()),
            received_at: Utc::now(),
        }
    }

    /// Set the JSON payload for the event.
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// Decode the event name and pull out identifying fields.
    pub fn kind(&self) -> KnownEvent {
        match self.name.as_str() {
            names::STUDENT_UPDATED => KnownEvent::StudentUpdated {
                student_id: self.student_id(),
            },
            names::MESSAGE_RECEIVED => KnownEvent::MessageReceived {
                conversation_id: self.conversation_id(),
            },
            names::MESSAGE_DELIVERED => KnownEvent::MessageDelivered {
                conversation_id: self.conversation_id(),
            },
            names::APPOINTMENT_UPDATED => KnownEvent::AppointmentUpdated,
            names::NOTIFICATION_SENT => KnownEvent::NotificationSent,
            names::DOCUMENT_UPDATED => KnownEvent::DocumentUpdated {
                student_id: self.student_id(),
            },
            _ => KnownEvent::Unknown,
        }
    }

    fn conversation_id(&self) -> Option<EntityId> {
        self.id_field(&["conversationId", "conversation_id"])
            .or_else(|| nested_id(&self.payload, "message", &["conversationId", "conversation_id"]))
    }

    fn student_id(&self) -> Option<EntityId> {
        self.id_field(&["studentId", "student_id"])
    }

    /// First of `keys` present on the payload as a non-empty string or a
    /// number.
    fn id_field(&self, keys: &[&str]) -> Option<EntityId> {
        keys.iter().find_map(|key| as_id(self.payload.get(*key)?))
    }
}

fn nested_id(payload: &serde_json::Value, parent: &str, keys: &[&str]) -> Option<EntityId> {
    let inner = payload.get(parent)?;
    keys.iter().find_map(|key| as_id(inner.get(*key)?))
}

fn as_id(value: &serde_json::Value) -> Option<EntityId> {
    match value {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn message_received_with_conversation_id() {
        let event = DomainEvent::new(names::MESSAGE_RECEIVED)
            .with_payload(json!({"conversationId": "c-42", "content": "hello"}));
        assert_eq!(
            event.kind(),
            KnownEvent::MessageReceived {
                conversation_id: Some("c-42".into())
            }
        );
    }

    #[test]
    fn message_received_reads_nested_message() {
        let event = DomainEvent::new(names::MESSAGE_RECEIVED)
            .with_payload(json!({"message": {"conversationId": "c-7"}}));
        assert_matches!(
            event.kind(),
            KnownEvent::MessageReceived { conversation_id: Some(id) } if id == "c-7"
        );
    }

    #[test]
    fn missing_or_blank_ids_decode_as_none() {
        let empty = DomainEvent::new(names::MESSAGE_DELIVERED);
        assert_eq!(
            empty.kind(),
            KnownEvent::MessageDelivered {
                conversation_id: None
            }
        );

        let blank =
            DomainEvent::new(names::STUDENT_UPDATED).with_payload(json!({"studentId": "  "}));
        assert_eq!(blank.kind(), KnownEvent::StudentUpdated { student_id: None });
    }

    #[test]
    fn non_object_payload_is_tolerated() {
        let event = DomainEvent::new(names::DOCUMENT_UPDATED).with_payload(json!("oops"));
        assert_eq!(event.kind(), KnownEvent::DocumentUpdated { student_id: None });
    }

    #[test]
    fn numeric_ids_are_stringified() {
        let event =
            DomainEvent::new(names::STUDENT_UPDATED).with_payload(json!({"studentId": 17}));
        assert_eq!(
            event.kind(),
            KnownEvent::StudentUpdated {
                student_id: Some("17".into())
            }
        );
    }

    #[test]
    fn unknown_names_decode_as_unknown() {
        assert_eq!(DomainEvent::new("visa_updated").kind(), KnownEvent::Unknown);
    }
}
