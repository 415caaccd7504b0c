//! Channel wire frames.
//!
//! Both transports carry JSON text frames shaped
//! `{"event": "<name>", "data": <payload>}`. `data` may be absent, in
//! which case it decodes as `null`.

use serde::{Deserialize, Serialize};

use crate::event::DomainEvent;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl Frame {
    pub fn new(event: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    /// Serialize for a text frame.
    pub fn to_text(&self) -> String {
        // A struct of String + Value always serializes.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Lift an inbound frame into a domain event stamped with the
    /// current time.
    pub fn into_event(self) -> DomainEvent {
        DomainEvent::new(self.event).with_payload(self.data)
    }
}

/// Parse a text frame received from the server.
///
/// Returns `Err` for malformed JSON or a missing `event` field. Callers
/// should log and continue.
pub fn parse_frame(text: &str) -> Result<Frame, serde_json::Error> {
    serde_json::from_str(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_frame_with_payload() {
        let frame =
            parse_frame(r#"{"event":"message_received","data":{"conversationId":"c1"}}"#).unwrap();
        assert_eq!(frame.event, "message_received");
        assert_eq!(frame.data["conversationId"], "c1");
    }

    #[test]
    fn parse_frame_without_data_defaults_to_null() {
        let frame = parse_frame(r#"{"event":"notification_sent"}"#).unwrap();
        assert!(frame.data.is_null());
    }

    #[test]
    fn parse_frame_without_event_is_an_error() {
        assert!(parse_frame(r#"{"data":{}}"#).is_err());
        assert!(parse_frame("not json at all").is_err());
    }

    #[test]
    fn to_text_is_parseable() {
        let frame = Frame::new("join", json!("admin-1"));
        assert_eq!(parse_frame(&frame.to_text()).unwrap(), frame);
    }
}
