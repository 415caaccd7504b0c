//! Wire names of channel events.
//!
//! These must match the names the backend emits and listens for.

// ---------------------------------------------------------------------------
// Inbound domain events
// ---------------------------------------------------------------------------

pub const STUDENT_UPDATED: &str = "student_updated";
pub const MESSAGE_RECEIVED: &str = "message_received";
pub const MESSAGE_DELIVERED: &str = "message_delivered";
pub const APPOINTMENT_UPDATED: &str = "appointment_updated";
pub const NOTIFICATION_SENT: &str = "notification_sent";
pub const DOCUMENT_UPDATED: &str = "document_updated";

/// Every inbound domain event the invalidation router listens for.
pub const DOMAIN_EVENTS: &[&str] = &[
    STUDENT_UPDATED,
    MESSAGE_RECEIVED,
    MESSAGE_DELIVERED,
    APPOINTMENT_UPDATED,
    NOTIFICATION_SENT,
    DOCUMENT_UPDATED,
];

// ---------------------------------------------------------------------------
// Outbound control messages
// ---------------------------------------------------------------------------

pub const JOIN: &str = "join";
pub const JOIN_CONVERSATION: &str = "join-conversation";
pub const LEAVE_CONVERSATION: &str = "leave-conversation";
pub const TYPING: &str = "typing";
pub const STOP_TYPING: &str = "stop-typing";
