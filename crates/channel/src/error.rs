/// Errors produced by channel transports.
///
/// These stay inside the crate's connection task; they are logged and
/// turned into [`ChannelStatus`](crate::ChannelStatus) updates rather than
/// surfaced to callers.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ChannelError {
    /// Failed to establish a connection.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A protocol-level error on an already-established connection.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The transport has been closed.
    #[error("Transport closed")]
    Closed,
}
