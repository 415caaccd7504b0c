//! Event channel client for the Fly8 backend.
//!
//! Maintains one authenticated bidirectional connection per admin
//! session, reconnects with bounded backoff, falls back from WebSocket to
//! HTTP long-polling, and fans inbound [`DomainEvent`]s out to registered
//! handlers in registration order.
//!
//! Connection errors are logged and reported on the status broadcast,
//! never returned to callers: the dashboard keeps working off its polling
//! fallback while the channel is down.
//!
//! [`DomainEvent`]: fly8_events::DomainEvent

pub mod client;
pub mod connector;
pub mod error;
pub mod handlers;
pub mod polling;
pub mod reconnect;
pub mod transport;
pub mod ws;

pub use client::{ChannelClient, ChannelConfig, ChannelStatus};
pub use connector::DefaultConnector;
pub use error::ChannelError;
pub use handlers::{EventHandler, HandlerId, HandlerRegistry};
pub use reconnect::ReconnectConfig;
pub use transport::{Connector, Transport, TransportKind};
