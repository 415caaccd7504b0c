//! HTTP long-poll transport, used when the WebSocket upgrade fails.
//!
//! Protocol:
//!
//! | Step      | Request                                   | Response          |
//! |-----------|-------------------------------------------|-------------------|
//! | handshake | `POST {base}/realtime/handshake`          | `{"sid": "..."}`  |
//! | receive   | `GET  {base}/realtime/poll?sid=...`       | `[Frame, ...]`    |
//! | send      | `POST {base}/realtime/emit?sid=...`       | any 2xx           |
//!
//! A background task keeps one poll request outstanding and forwards
//! frames into a channel, which keeps [`Transport::recv`] cancel-safe.

use async_trait::async_trait;
use fly8_events::Frame;
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::error::ChannelError;
use crate::transport::{Transport, TransportKind};

/// Buffered inbound frames between the poll task and the consumer.
const INBOUND_BUFFER: usize = 256;

#[derive(Debug, Deserialize)]
struct Handshake {
    sid: String,
}

pub struct LongPollTransport {
    http: reqwest::Client,
    base_url: String,
    sid: String,
    token: Option<String>,
    inbound: mpsc::Receiver<Result<Frame, ChannelError>>,
    poller: tokio::task::JoinHandle<()>,
}

impl LongPollTransport {
    /// Perform the handshake and start polling.
    pub async fn connect(
        http: reqwest::Client,
        base_url: &str,
        token: Option<&str>,
    ) -> Result<Self, ChannelError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let token = token.map(str::to_string);

        let response = authorized(
            http.post(format!("{base_url}/realtime/handshake")),
            token.as_deref(),
        )
        .send()
        .await
        .map_err(|e| ChannelError::Connection(format!("Handshake failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChannelError::Connection(format!(
                "Handshake rejected ({})",
                status.as_u16()
            )));
        }

        let handshake: Handshake = response
            .json()
            .await
            .map_err(|e| ChannelError::Protocol(format!("Malformed handshake: {e}")))?;

        let (tx, inbound) = mpsc::channel(INBOUND_BUFFER);
        let poll_url = format!("{base_url}/realtime/poll?sid={}", handshake.sid);
        let poller = tokio::spawn(poll_loop(http.clone(), poll_url, token.clone(), tx));

        tracing::info!(sid = %handshake.sid, "Long-poll channel connected");

        Ok(Self {
            http,
            base_url,
            sid: handshake.sid,
            token,
            inbound,
            poller,
        })
    }
}

#[async_trait]
impl Transport for LongPollTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::LongPolling
    }

    async fn send(&mut self, frame: &Frame) -> Result<(), ChannelError> {
        let response = authorized(
            self.http
                .post(format!("{}/realtime/emit?sid={}", self.base_url, self.sid)),
            self.token.as_deref(),
        )
        .json(frame)
        .send()
        .await
        .map_err(|e| ChannelError::Protocol(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ChannelError::Protocol(format!(
                "Emit rejected ({})",
                response.status().as_u16()
            )))
        }
    }

    async fn recv(&mut self) -> Option<Result<Frame, ChannelError>> {
        self.inbound.recv().await
    }

    async fn close(&mut self) {
        self.poller.abort();
        self.inbound.close();
    }
}

impl Drop for LongPollTransport {
    fn drop(&mut self) {
        self.poller.abort();
    }
}

/// Keep one poll request outstanding until the server fails or the
/// consumer goes away. A failure is forwarded once, then the channel is
/// closed so the consumer observes the drop.
async fn poll_loop(
    http: reqwest::Client,
    url: String,
    token: Option<String>,
    tx: mpsc::Sender<Result<Frame, ChannelError>>,
) {
    loop {
        let response = authorized(http.get(&url), token.as_deref()).send().await;

        let frames = match response {
            Ok(resp) if resp.status().is_success() => resp
                .json::<Vec<Frame>>()
                .await
                .map_err(|e| ChannelError::Protocol(format!("Malformed poll body: {e}"))),
            Ok(resp) => Err(ChannelError::Connection(format!(
                "Poll rejected ({})",
                resp.status().as_u16()
            ))),
            Err(e) => Err(ChannelError::Connection(e.to_string())),
        };

        match frames {
            Ok(frames) => {
                for frame in frames {
                    if tx.send(Ok(frame)).await.is_err() {
                        return;
                    }
                }
            }
            Err(e) => {
                let _ = tx.send(Err(e)).await;
                return;
            }
        }
    }
}

fn authorized(request: reqwest::RequestBuilder, token: Option<&str>) -> reqwest::RequestBuilder {
    match token {
        Some(token) => request.bearer_auth(token),
        None => request,
    }
}
