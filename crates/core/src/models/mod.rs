//! Server-owned domain records as they arrive over REST.
//!
//! The backend speaks camelCase JSON with Mongo-style `_id` keys. Every
//! struct here only declares the fields the dashboard actually reads;
//! unknown fields are ignored.

pub mod appointment;
pub mod message;
pub mod notification;
pub mod person;
pub mod student;

pub use appointment::{Appointment, AppointmentStatus};
pub use message::{Conversation, Message, MessageStatus, SendMessage};
pub use notification::{Notification, NotificationPriority, NotificationStatus, NotificationType};
pub use person::{EntityRef, PersonSummary};
pub use student::{Student, StudentStatusFilter, StudentStatusUpdate};
