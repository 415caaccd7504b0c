//! Network-backed [`Connector`].

use async_trait::async_trait;

use crate::error::ChannelError;
use crate::polling::LongPollTransport;
use crate::transport::{Connector, Transport, TransportKind};
use crate::ws::WsTransport;

/// Opens real WebSocket and long-poll transports against the backend.
pub struct DefaultConnector {
    base_url: String,
    http: reqwest::Client,
}

impl DefaultConnector {
    /// * `base_url` - channel base URL, e.g. `http://localhost:4000`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
        }
    }

    /// Reuse an existing [`reqwest::Client`] for the long-poll transport.
    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http,
        }
    }
}

#[async_trait]
impl Connector for DefaultConnector {
    async fn open(
        &self,
        kind: TransportKind,
        token: Option<&str>,
    ) -> Result<Box<dyn Transport>, ChannelError> {
        match kind {
            TransportKind::WebSocket => {
                let transport = WsTransport::connect(&self.base_url, token).await?;
                Ok(Box::new(transport))
            }
            TransportKind::LongPolling => {
                let transport =
                    LongPollTransport::connect(self.http.clone(), &self.base_url, token).await?;
                Ok(Box::new(transport))
            }
        }
    }
}
