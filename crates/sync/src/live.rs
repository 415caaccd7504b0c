//! [`LiveDashboard`]: one admin session's synchronization stack.
//!
//! Owns the REST client, the query store, the event channel, the poll
//! scheduler and the mutations, and wires them together: channel events
//! invalidate the store through the router, a 401 from the backend
//! disconnects the channel, and unreferenced entries are swept
//! periodically.

use std::sync::{Arc, Mutex};

use fly8_api::ApiClient;
use fly8_cache::{PollConfig, PollScheduler, QueryKey, QueryStore, Subscription};
use fly8_channel::ChannelClient;
use fly8_core::session::SessionStore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::fetcher::DashboardFetcher;
use crate::keys;
use crate::mutations::Mutations;
use crate::router::{InvalidationRouter, RouterGuard};
use crate::views::StudentSearch;

pub struct LiveDashboard {
    config: SyncConfig,
    session: Arc<dyn SessionStore>,
    api: Arc<ApiClient>,
    store: QueryStore,
    channel: Arc<ChannelClient>,
    scheduler: PollScheduler,
    mutations: Mutations,
    cancel: CancellationToken,
    gc: Mutex<Option<JoinHandle<()>>>,
}

impl LiveDashboard {
    /// Build the stack against the configured backend.
    pub fn new(config: SyncConfig, session: Arc<dyn SessionStore>) -> Result<Self, SyncError> {
        let api = ApiClient::new(&config.api_url, config.request_timeout, Arc::clone(&session))?;
        let channel = ChannelClient::new(config.channel(), Arc::clone(&session));
        Ok(Self::with_parts(config, Arc::new(api), Arc::new(channel)))
    }

    /// Assemble from pre-built clients. The session store is taken from
    /// `api`.
    pub fn with_parts(config: SyncConfig, api: Arc<ApiClient>, channel: Arc<ChannelClient>) -> Self {
        let session = Arc::clone(api.session());
        let fetcher = Arc::new(DashboardFetcher::new(Arc::clone(&api)));
        let store = QueryStore::with_timeout(fetcher, config.request_timeout);

        let weak = Arc::downgrade(&channel);
        api.on_unauthenticated(move || {
            if let Some(channel) = weak.upgrade() {
                tracing::warn!("Session rejected by backend, disconnecting event channel");
                channel.disconnect();
            }
        });

        Self {
            scheduler: PollScheduler::new(store.clone()),
            mutations: Mutations::new(Arc::clone(&api), store.clone()),
            config,
            session,
            api,
            store,
            channel,
            cancel: CancellationToken::new(),
            gc: Mutex::new(None),
        }
    }

    /// Connect the channel for the stored user, start the cache sweep and
    /// attach the invalidation router.
    ///
    /// The router stays attached while the returned guard lives.
    pub fn start(&self) -> Result<RouterGuard, SyncError> {
        let session = self.session.load()?.ok_or(SyncError::NotLoggedIn)?;

        let router = InvalidationRouter::attach(Arc::clone(&self.channel), self.store.clone());
        self.channel.connect(session.user.id.clone());

        let gc_after = self.config.cache_gc_after;
        if !gc_after.is_zero() {
            let mut gc = self.gc.lock().unwrap_or_else(|e| e.into_inner());
            if gc.is_none() {
                *gc = Some(self.store.spawn_gc(gc_after, gc_after, self.cancel.child_token()));
            }
        }

        tracing::info!(user_id = %session.user.id, "Live dashboard started");
        Ok(router)
    }

    /// Subscribe to `key` and poll it per `poll` while subscribed.
    ///
    /// A key that is already polled keeps its running schedule. Polling
    /// stops on its own once the last subscription is dropped.
    pub fn watch(&self, key: QueryKey, poll: PollConfig) -> Subscription {
        let subscription = self.store.subscribe(key.clone());
        if !self.scheduler.is_scheduled(&key) {
            self.scheduler.schedule(key, poll);
        }
        subscription
    }

    /// Poll cadence for a key kind.
    pub fn poll_for(&self, kind: &str) -> PollConfig {
        match kind {
            keys::TODAY_APPOINTMENTS => self.config.today_poll,
            _ => self.config.stats_poll,
        }
    }

    /// Student list query whose search input is debounced by
    /// `SEARCH_DEBOUNCE_MS`.
    pub fn student_search(&self) -> StudentSearch {
        StudentSearch::new(self.config.search_debounce)
    }

    /// Join the conversation room and watch its first thread page.
    pub fn open_conversation(&self, conversation_id: &str) -> Subscription {
        self.channel.join_conversation(conversation_id);
        self.watch(keys::messages(conversation_id), self.poll_for(keys::MESSAGES))
    }

    /// Leave the conversation room. Thread polling ends when its last
    /// subscription is dropped.
    pub fn close_conversation(&self, conversation_id: &str) {
        self.channel.leave_conversation(conversation_id);
    }

    /// Forget the session and drop the channel connection.
    pub fn logout(&self) -> Result<(), SyncError> {
        self.session.clear()?;
        self.channel.disconnect();
        self.scheduler.shutdown();
        tracing::info!("Logged out");
        Ok(())
    }

    /// Stop polling, sweeping and the channel, waiting for the channel
    /// task to close its transport.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.scheduler.shutdown();
        self.channel.shutdown().await;

        let gc = self.gc.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = gc {
            let _ = handle.await;
        }
        tracing::info!("Live dashboard stopped");
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn api(&self) -> &Arc<ApiClient> {
        &self.api
    }

    pub fn store(&self) -> &QueryStore {
        &self.store
    }

    pub fn channel(&self) -> &Arc<ChannelClient> {
        &self.channel
    }

    pub fn scheduler(&self) -> &PollScheduler {
        &self.scheduler
    }

    pub fn mutations(&self) -> &Mutations {
        &self.mutations
    }

    pub fn session(&self) -> &Arc<dyn SessionStore> {
        &self.session
    }
}

impl Drop for LiveDashboard {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
