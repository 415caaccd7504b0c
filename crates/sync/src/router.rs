//! Event-to-invalidation routing.
//!
//! [`prefixes_for`] is the static table from inbound event to the cache
//! prefixes it makes stale. When the payload lacks the id needed for a
//! narrow prefix, the whole kind is invalidated instead.
//!
//! [`InvalidationRouter::attach`] wires the table to a channel client and
//! a store. The returned [`RouterGuard`] removes the handlers when
//! dropped, so only mounted views drive invalidation.

use std::sync::Arc;

use fly8_cache::{QueryPrefix, QueryStore};
use fly8_channel::{ChannelClient, HandlerId};
use fly8_events::names::DOMAIN_EVENTS;
use fly8_events::{DomainEvent, KnownEvent};

use crate::keys;

/// Cache prefixes invalidated by `event`. Empty for unknown events.
pub fn prefixes_for(event: &DomainEvent) -> Vec<QueryPrefix> {
    match event.kind() {
        KnownEvent::StudentUpdated { student_id } => vec![
            QueryPrefix::kind(keys::STUDENTS),
            QueryPrefix::kind(keys::STUDENT_STATS),
            scoped(keys::STUDENT, student_id),
        ],
        KnownEvent::MessageReceived { conversation_id } => vec![
            scoped(keys::MESSAGES, conversation_id),
            QueryPrefix::kind(keys::CONVERSATIONS),
            QueryPrefix::kind(keys::MESSAGE_STATS),
        ],
        KnownEvent::MessageDelivered { conversation_id } => {
            vec![scoped(keys::MESSAGES, conversation_id)]
        }
        KnownEvent::AppointmentUpdated => vec![
            QueryPrefix::kind(keys::APPOINTMENT_STATS),
            QueryPrefix::kind(keys::TODAY_APPOINTMENTS),
        ],
        KnownEvent::NotificationSent => vec![
            QueryPrefix::kind(keys::NOTIFICATIONS),
            QueryPrefix::kind(keys::NOTIFICATION_STATS),
        ],
        KnownEvent::DocumentUpdated { student_id } => vec![scoped(keys::STUDENT, student_id)],
        KnownEvent::Unknown => Vec::new(),
    }
}

/// Narrow to `id` when present, otherwise the whole kind.
fn scoped(kind: &str, id: Option<String>) -> QueryPrefix {
    match id {
        Some(id) => QueryPrefix::kind(kind).with_id(id),
        None => QueryPrefix::kind(kind),
    }
}

/// Apply the routing table for one event. Returns the number of cache
/// entries marked stale.
pub fn route(store: &QueryStore, event: &DomainEvent) -> usize {
    let prefixes = prefixes_for(event);
    if prefixes.is_empty() {
        tracing::debug!(event = %event.name, "No invalidation route for event");
        return 0;
    }

    let matched: usize = prefixes.iter().map(|prefix| store.invalidate(prefix)).sum();
    tracing::debug!(
        event = %event.name,
        prefixes = prefixes.len(),
        matched,
        "Routed event to cache invalidation",
    );
    matched
}

pub struct InvalidationRouter;

impl InvalidationRouter {
    /// Register a handler for every known domain event.
    pub fn attach(channel: Arc<ChannelClient>, store: QueryStore) -> RouterGuard {
        let handlers = DOMAIN_EVENTS
            .iter()
            .map(|&name| {
                let store = store.clone();
                let id = channel.subscribe(name, move |event| {
                    route(&store, event);
                });
                (name, id)
            })
            .collect();

        tracing::debug!(events = DOMAIN_EVENTS.len(), "Invalidation router attached");
        RouterGuard { channel, handlers }
    }
}

/// Detaches the router's handlers when dropped.
pub struct RouterGuard {
    channel: Arc<ChannelClient>,
    handlers: Vec<(&'static str, HandlerId)>,
}

impl std::fmt::Debug for RouterGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterGuard")
            .field("handlers", &self.handlers)
            .finish_non_exhaustive()
    }
}

impl Drop for RouterGuard {
    fn drop(&mut self) {
        for (name, id) in self.handlers.drain(..) {
            self.channel.unsubscribe(name, Some(id));
        }
        tracing::debug!("Invalidation router detached");
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn event(name: &str, payload: serde_json::Value) -> DomainEvent {
        DomainEvent::new(name).with_payload(payload)
    }

    #[test]
    fn message_received_with_id_is_narrow() {
        let prefixes = prefixes_for(&event(
            "message_received",
            json!({ "conversationId": "c1" }),
        ));
        assert_eq!(
            prefixes,
            vec![
                QueryPrefix::kind("messages").with_id("c1"),
                QueryPrefix::kind("conversations"),
                QueryPrefix::kind("messageStats"),
            ]
        );
    }

    #[test]
    fn message_received_without_id_falls_back_to_all_messages() {
        let prefixes = prefixes_for(&event("message_received", json!({})));
        assert_eq!(prefixes[0], QueryPrefix::kind("messages"));
        assert!(prefixes[0].is_broad());
    }

    #[test]
    fn student_updated_includes_detail_key_when_id_present() {
        let prefixes = prefixes_for(&event("student_updated", json!({ "studentId": "s9" })));
        assert!(prefixes.contains(&QueryPrefix::kind("students")));
        assert!(prefixes.contains(&QueryPrefix::kind("studentStats")));
        assert!(prefixes.contains(&QueryPrefix::kind("student").with_id("s9")));
    }

    #[test]
    fn document_updated_without_id_invalidates_every_student_detail() {
        let prefixes = prefixes_for(&event("document_updated", serde_json::Value::Null));
        assert_eq!(prefixes, vec![QueryPrefix::kind("student")]);
    }

    #[test]
    fn appointment_and_notification_events() {
        assert_eq!(
            prefixes_for(&event("appointment_updated", json!({}))),
            vec![
                QueryPrefix::kind("appointmentStats"),
                QueryPrefix::kind("todayAppointments"),
            ]
        );
        assert_eq!(
            prefixes_for(&event("notification_sent", json!({ "id": 1 }))),
            vec![
                QueryPrefix::kind("notifications"),
                QueryPrefix::kind("notificationStats"),
            ]
        );
    }

    #[test]
    fn unknown_event_routes_nowhere() {
        assert!(prefixes_for(&event("visa_updated", json!({}))).is_empty());
    }
}
