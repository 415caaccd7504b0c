//! Transport abstraction.
//!
//! A [`Connector`] opens a [`Transport`] of a given [`TransportKind`]; the
//! client tries kinds in preference order and keeps the first that
//! connects.

use async_trait::async_trait;
use fly8_events::Frame;

use crate::error::ChannelError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// Preferred low-latency full-duplex mode.
    WebSocket,
    /// Compatible fallback: HTTP long-poll for inbound, POST for outbound.
    LongPolling,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportKind::WebSocket => f.write_str("websocket"),
            TransportKind::LongPolling => f.write_str("polling"),
        }
    }
}

/// An open, bidirectional frame connection.
#[async_trait]
pub trait Transport: Send {
    fn kind(&self) -> TransportKind;

    async fn send(&mut self, frame: &Frame) -> Result<(), ChannelError>;

    /// Next inbound frame, or `None` once the peer has closed.
    ///
    /// Must be cancel-safe: the connection task races it against outbound
    /// sends and shutdown.
    async fn recv(&mut self) -> Option<Result<Frame, ChannelError>>;

    async fn close(&mut self);
}

/// Opens transports to the backend.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(
        &self,
        kind: TransportKind,
        token: Option<&str>,
    ) -> Result<Box<dyn Transport>, ChannelError>;
}

/// Try each transport kind in order and return the first that connects.
///
/// Failures of earlier kinds are logged; the last error is returned when
/// every kind fails.
pub async fn connect_any(
    connector: &dyn Connector,
    kinds: &[TransportKind],
    token: Option<&str>,
) -> Result<Box<dyn Transport>, ChannelError> {
    let mut last_error = ChannelError::Connection("no transports configured".into());

    for &kind in kinds {
        match connector.open(kind, token).await {
            Ok(transport) => return Ok(transport),
            Err(e) => {
                tracing::warn!(transport = %kind, error = %e, "Transport negotiation failed");
                last_error = e;
            }
        }
    }

    Err(last_error)
}
