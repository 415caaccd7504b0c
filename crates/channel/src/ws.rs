//! WebSocket transport.
//!
//! Connects to `{base}/realtime/ws?clientId=<uuid>` with the bearer token
//! in the `Authorization` header. The base URL's `http(s)` scheme is
//! rewritten to `ws(s)`.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use fly8_events::{parse_frame, Frame};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::ChannelError;
use crate::transport::{Transport, TransportKind};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// A live WebSocket connection to the backend.
pub struct WsTransport {
    /// Unique client ID sent during the handshake.
    client_id: String,
    stream: WsStream,
}

impl WsTransport {
    /// Open a WebSocket connection.
    pub async fn connect(base_url: &str, token: Option<&str>) -> Result<Self, ChannelError> {
        let client_id = uuid::Uuid::new_v4().to_string();
        let url = format!("{}/realtime/ws?clientId={}", ws_base(base_url), client_id);

        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| ChannelError::Connection(format!("Invalid channel URL {url}: {e}")))?;

        if let Some(token) = token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| ChannelError::Connection(format!("Invalid bearer token: {e}")))?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        let (stream, _response) = connect_async(request).await.map_err(|e| {
            ChannelError::Connection(format!("Failed to connect to {base_url}: {e}"))
        })?;

        tracing::info!(client_id = %client_id, "WebSocket channel connected");

        Ok(Self { client_id, stream })
    }
}

#[async_trait]
impl Transport for WsTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::WebSocket
    }

    async fn send(&mut self, frame: &Frame) -> Result<(), ChannelError> {
        self.stream
            .send(Message::Text(frame.to_text()))
            .await
            .map_err(|e| ChannelError::Protocol(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<Frame, ChannelError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => match parse_frame(&text) {
                    Ok(frame) => return Some(Ok(frame)),
                    Err(e) => {
                        tracing::warn!(
                            client_id = %self.client_id,
                            error = %e,
                            raw_message = %text,
                            "Failed to parse channel frame",
                        );
                    }
                },
                Ok(Message::Close(frame)) => {
                    tracing::info!(client_id = %self.client_id, ?frame, "WebSocket closed by server");
                    return None;
                }
                Ok(Message::Ping(_) | Message::Pong(_)) => {
                    // Handled automatically by tungstenite.
                }
                Ok(Message::Binary(_) | Message::Frame(_)) => {
                    tracing::trace!(client_id = %self.client_id, "Ignoring non-text frame");
                }
                Err(e) => return Some(Err(ChannelError::Protocol(e.to_string()))),
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            tracing::debug!(client_id = %self.client_id, error = %e, "WebSocket close failed");
        }
    }
}

/// Rewrite an `http(s)://` base URL to `ws(s)://`, trimming any trailing
/// slash.
pub fn ws_base(base_url: &str) -> String {
    let trimmed = base_url.trim_end_matches('/');
    if let Some(rest) = trimmed.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = trimmed.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        trimmed.to_string()
    }
}
