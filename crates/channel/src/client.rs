//! The event channel client.
//!
//! [`ChannelClient`] owns at most one connection task per admin session.
//! The task negotiates a transport, announces the session (`join` first,
//! then any conversation rooms), pumps frames in both directions, and on
//! a drop runs the bounded reconnect loop before announcing again.

use std::collections::{BTreeSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use fly8_core::session::SessionStore;
use fly8_core::types::EntityId;
use fly8_events::{ControlMessage, DomainEvent, Frame};
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use crate::connector::DefaultConnector;
use crate::error::ChannelError;
use crate::handlers::{HandlerId, HandlerRegistry};
use crate::reconnect::{reconnect_loop, ReconnectConfig, ReconnectOutcome};
use crate::transport::{connect_any, Connector, Transport, TransportKind};

/// Broadcast channel capacity for connection status changes.
const STATUS_CHANNEL_CAPACITY: usize = 32;

/// How long [`ChannelClient::shutdown`] waits for the task to exit.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Channel base URL, e.g. `http://localhost:4000`.
    pub url: String,
    /// Transports in preference order.
    pub transports: Vec<TransportKind>,
    pub reconnect: ReconnectConfig,
}

impl ChannelConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            transports: vec![TransportKind::WebSocket, TransportKind::LongPolling],
            reconnect: ReconnectConfig::default(),
        }
    }
}

/// Connection lifecycle as reported on [`ChannelClient::status_updates`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelStatus {
    Connected { transport: TransportKind },
    Disconnected,
    /// Reconnection gave up; polling remains the only freshness source.
    ReconnectFailed { attempts: u32 },
}

/// State shared between the client handle and its connection task.
struct Shared {
    user_id: Mutex<Option<EntityId>>,
    rooms: Mutex<BTreeSet<EntityId>>,
    status: Mutex<ChannelStatus>,
    status_tx: broadcast::Sender<ChannelStatus>,
}

impl Shared {
    fn publish(&self, status: ChannelStatus) {
        *self.status.lock().unwrap_or_else(|e| e.into_inner()) = status.clone();
        // No receivers is fine.
        let _ = self.status_tx.send(status);
    }

    fn rooms(&self) -> Vec<EntityId> {
        self.rooms
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }
}

/// A running connection task and its control handles.
struct Link {
    outbound: mpsc::UnboundedSender<Frame>,
    cancel: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

pub struct ChannelClient {
    config: ChannelConfig,
    connector: Arc<dyn Connector>,
    session: Arc<dyn SessionStore>,
    handlers: Arc<HandlerRegistry>,
    shared: Arc<Shared>,
    link: Mutex<Option<Link>>,
}

impl ChannelClient {
    /// Create a client that connects over the network.
    pub fn new(config: ChannelConfig, session: Arc<dyn SessionStore>) -> Self {
        let connector = Arc::new(DefaultConnector::new(config.url.clone()));
        Self::with_connector(config, connector, session)
    }

    /// Create a client with a custom [`Connector`].
    pub fn with_connector(
        config: ChannelConfig,
        connector: Arc<dyn Connector>,
        session: Arc<dyn SessionStore>,
    ) -> Self {
        let (status_tx, _) = broadcast::channel(STATUS_CHANNEL_CAPACITY);
        Self {
            config,
            connector,
            session,
            handlers: Arc::new(HandlerRegistry::new()),
            shared: Arc::new(Shared {
                user_id: Mutex::new(None),
                rooms: Mutex::new(BTreeSet::new()),
                status: Mutex::new(ChannelStatus::Disconnected),
                status_tx,
            }),
            link: Mutex::new(None),
        }
    }

    /// Start the connection task for `user_id`.
    ///
    /// No-op while a connection task is already running. Must be called
    /// from within a Tokio runtime.
    pub fn connect(&self, user_id: impl Into<EntityId>) {
        let user_id = user_id.into();
        let mut link = self.link.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(existing) = link.as_ref() {
            if !existing.task.is_finished() {
                tracing::warn!(user_id = %user_id, "Event channel already running, ignoring connect");
                return;
            }
        }

        *self.shared.user_id.lock().unwrap_or_else(|e| e.into_inner()) = Some(user_id.clone());

        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let task = ConnectionTask {
            connector: Arc::clone(&self.connector),
            session: Arc::clone(&self.session),
            handlers: Arc::clone(&self.handlers),
            shared: Arc::clone(&self.shared),
            kinds: self.config.transports.clone(),
            reconnect: self.config.reconnect.clone(),
            user_id,
        };

        let handle = tokio::spawn(task.run(outbound_rx, cancel.clone()));
        *link = Some(Link {
            outbound,
            cancel,
            task: handle,
        });
    }

    /// Close the connection and forget the user and joined rooms.
    ///
    /// Idempotent; registered handlers are kept.
    pub fn disconnect(&self) {
        if let Some(link) = self.link.lock().unwrap_or_else(|e| e.into_inner()).take() {
            link.cancel.cancel();
            tracing::info!("Event channel disconnect requested");
        }
        self.forget_session();
    }

    /// Like [`disconnect`](Self::disconnect), but waits for the task to
    /// finish closing the transport.
    pub async fn shutdown(&self) {
        let link = self.link.lock().unwrap_or_else(|e| e.into_inner()).take();
        self.forget_session();

        if let Some(link) = link {
            link.cancel.cancel();
            if tokio::time::timeout(SHUTDOWN_TIMEOUT, link.task).await.is_err() {
                tracing::warn!("Event channel task did not stop in time");
            }
        }
    }

    /// Register a handler for an inbound event name.
    pub fn subscribe<F>(&self, event: &str, handler: F) -> HandlerId
    where
        F: Fn(&DomainEvent) + Send + Sync + 'static,
    {
        self.handlers.add(event, Arc::new(handler))
    }

    /// Remove one handler, or all handlers for `event` when `id` is `None`.
    pub fn unsubscribe(&self, event: &str, id: Option<HandlerId>) -> usize {
        self.handlers.remove(event, id)
    }

    pub fn handlers(&self) -> &Arc<HandlerRegistry> {
        &self.handlers
    }

    /// Queue an outbound frame.
    ///
    /// Frames queued while the transport is reconnecting are sent once it
    /// is back. Without a connection task the frame is dropped.
    pub fn emit(&self, event: &str, data: serde_json::Value) {
        self.send_frame(Frame::new(event, data));
    }

    /// Queue a control message.
    pub fn send_control(&self, message: ControlMessage) {
        self.send_frame(message.to_frame());
    }

    /// Join a conversation room. The room is remembered and re-joined
    /// after every reconnect.
    pub fn join_conversation(&self, conversation_id: impl Into<EntityId>) {
        let conversation_id = conversation_id.into();
        let added = self
            .shared
            .rooms
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(conversation_id.clone());

        // While disconnected the room is announced on the next connect.
        if added && self.is_connected() {
            self.send_control(ControlMessage::JoinConversation { conversation_id });
        }
    }

    pub fn leave_conversation(&self, conversation_id: &str) {
        let removed = self
            .shared
            .rooms
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(conversation_id);

        if removed && self.is_connected() {
            self.send_control(ControlMessage::LeaveConversation {
                conversation_id: conversation_id.to_string(),
            });
        }
    }

    /// Send a typing indicator for the connected user.
    pub fn send_typing(&self, conversation_id: &str, user_name: &str) {
        let Some(user_id) = self.user_id() else {
            tracing::debug!("Typing indicator without a connected user");
            return;
        };
        self.send_control(ControlMessage::Typing {
            conversation_id: conversation_id.to_string(),
            user_id,
            user_name: user_name.to_string(),
        });
    }

    pub fn stop_typing(&self, conversation_id: &str) {
        let Some(user_id) = self.user_id() else {
            return;
        };
        self.send_control(ControlMessage::StopTyping {
            conversation_id: conversation_id.to_string(),
            user_id,
        });
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.status(), ChannelStatus::Connected { .. })
    }

    /// The most recently published status.
    pub fn status(&self) -> ChannelStatus {
        self.shared
            .status
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn status_updates(&self) -> broadcast::Receiver<ChannelStatus> {
        self.shared.status_tx.subscribe()
    }

    pub fn user_id(&self) -> Option<EntityId> {
        self.shared
            .user_id
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Conversation rooms that will be joined on (re)connect.
    pub fn joined_rooms(&self) -> Vec<EntityId> {
        self.shared.rooms()
    }

    // ---- private helpers ----

    fn send_frame(&self, frame: Frame) {
        let link = self.link.lock().unwrap_or_else(|e| e.into_inner());
        match link.as_ref() {
            Some(link) => {
                if link.outbound.send(frame).is_err() {
                    tracing::debug!("Event channel task has stopped, frame dropped");
                }
            }
            None => tracing::debug!(event = %frame.event, "No event channel, frame dropped"),
        }
    }

    fn forget_session(&self) {
        *self.shared.user_id.lock().unwrap_or_else(|e| e.into_inner()) = None;
        self.shared
            .rooms
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

impl Drop for ChannelClient {
    fn drop(&mut self) {
        if let Some(link) = self.link.get_mut().unwrap_or_else(|e| e.into_inner()).take() {
            link.cancel.cancel();
        }
    }
}

// ---------------------------------------------------------------------------
// Connection task
// ---------------------------------------------------------------------------

/// Why a connection stopped pumping.
enum PumpEnd {
    /// Shutdown requested or the client handle was dropped.
    Stopped,
    /// The transport failed or the peer closed.
    Dropped,
}

enum Step {
    Cancelled,
    Outbound(Option<Frame>),
    Inbound(Option<Result<Frame, ChannelError>>),
}

struct ConnectionTask {
    connector: Arc<dyn Connector>,
    session: Arc<dyn SessionStore>,
    handlers: Arc<HandlerRegistry>,
    shared: Arc<Shared>,
    kinds: Vec<TransportKind>,
    reconnect: ReconnectConfig,
    user_id: EntityId,
}

impl ConnectionTask {
    async fn run(
        self,
        mut outbound: mpsc::UnboundedReceiver<Frame>,
        cancel: CancellationToken,
    ) {
        let token = self.session.token();
        let first = tokio::select! {
            _ = cancel.cancelled() => return,
            result = connect_any(self.connector.as_ref(), &self.kinds, token.as_deref()) => result,
        };

        let mut transport = match first {
            Ok(transport) => transport,
            Err(e) => {
                tracing::warn!(error = %e, "Event channel connect failed");
                match self.reconnect(&cancel).await {
                    Some(transport) => transport,
                    None => return,
                }
            }
        };

        // Frames that failed to send on a dying transport.
        let mut backlog: VecDeque<Frame> = VecDeque::new();

        loop {
            let kind = transport.kind();
            tracing::info!(user_id = %self.user_id, transport = %kind, "Event channel connected");
            self.shared.publish(ChannelStatus::Connected { transport: kind });

            let end = match self.announce(transport.as_mut(), &mut backlog).await {
                Ok(()) => {
                    self.pump(transport.as_mut(), &mut outbound, &mut backlog, &cancel)
                        .await
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Event channel announce failed");
                    PumpEnd::Dropped
                }
            };

            match end {
                PumpEnd::Stopped => {
                    transport.close().await;
                    self.shared.publish(ChannelStatus::Disconnected);
                    tracing::info!(user_id = %self.user_id, "Event channel closed");
                    return;
                }
                PumpEnd::Dropped => {
                    tracing::warn!(user_id = %self.user_id, "Event channel dropped");
                    self.shared.publish(ChannelStatus::Disconnected);
                }
            }

            transport = match self.reconnect(&cancel).await {
                Some(transport) => transport,
                None => return,
            };
        }
    }

    /// Run the reconnect loop, publishing `ReconnectFailed` on exhaustion.
    async fn reconnect(&self, cancel: &CancellationToken) -> Option<Box<dyn Transport>> {
        let outcome = reconnect_loop(
            self.connector.as_ref(),
            &self.kinds,
            self.session.as_ref(),
            &self.reconnect,
            cancel,
        )
        .await;

        match outcome {
            ReconnectOutcome::Connected(transport) => Some(transport),
            ReconnectOutcome::Exhausted { attempts } => {
                self.shared
                    .publish(ChannelStatus::ReconnectFailed { attempts });
                None
            }
            ReconnectOutcome::Cancelled => None,
        }
    }

    /// Announce the session on a fresh transport: `join` before any room,
    /// then every remembered room, then the backlog.
    async fn announce(
        &self,
        transport: &mut dyn Transport,
        backlog: &mut VecDeque<Frame>,
    ) -> Result<(), ChannelError> {
        let join = ControlMessage::Join {
            user_id: self.user_id.clone(),
        };
        transport.send(&join.to_frame()).await?;

        for conversation_id in self.shared.rooms() {
            let frame = ControlMessage::JoinConversation { conversation_id }.to_frame();
            transport.send(&frame).await?;
        }

        while let Some(frame) = backlog.pop_front() {
            if let Err(e) = transport.send(&frame).await {
                backlog.push_front(frame);
                return Err(e);
            }
        }

        Ok(())
    }

    async fn pump(
        &self,
        transport: &mut dyn Transport,
        outbound: &mut mpsc::UnboundedReceiver<Frame>,
        backlog: &mut VecDeque<Frame>,
        cancel: &CancellationToken,
    ) -> PumpEnd {
        loop {
            let step = tokio::select! {
                biased;
                _ = cancel.cancelled() => Step::Cancelled,
                frame = outbound.recv() => Step::Outbound(frame),
                inbound = transport.recv() => Step::Inbound(inbound),
            };

            match step {
                Step::Cancelled | Step::Outbound(None) => return PumpEnd::Stopped,
                Step::Outbound(Some(frame)) => {
                    if let Err(e) = transport.send(&frame).await {
                        tracing::warn!(event = %frame.event, error = %e, "Channel send failed");
                        backlog.push_back(frame);
                        return PumpEnd::Dropped;
                    }
                }
                Step::Inbound(Some(Ok(frame))) => {
                    let event = frame.into_event();
                    let handled = self.handlers.dispatch(&event);
                    tracing::debug!(event = %event.name, handlers = handled, "Channel event received");
                }
                Step::Inbound(Some(Err(e))) => {
                    tracing::warn!(error = %e, "Channel receive failed");
                    return PumpEnd::Dropped;
                }
                Step::Inbound(None) => return PumpEnd::Dropped,
            }
        }
    }
}
