//! Fly8 real-time event vocabulary.
//!
//! - [`DomainEvent`]: inbound server event envelope, with
//!   [`DomainEvent::kind`] decoding it into the tagged [`KnownEvent`] union.
//! - [`ControlMessage`]: outbound room/presence messages.
//! - [`Frame`]: the JSON text frame both transports carry.
//! - [`names`]: wire names for every event the dashboard knows.

pub mod control;
pub mod event;
pub mod frame;
pub mod names;

pub use control::ControlMessage;
pub use event::{DomainEvent, KnownEvent};
pub use frame::{parse_frame, Frame};
