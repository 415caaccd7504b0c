//! Polling fallback scheduler.
//!
//! Each scheduled key gets a task that calls [`QueryStore::refresh`] every
//! `interval` while the key has at least one subscriber. The task stops
//! on its own when the last subscriber is released. Poll ticks are not
//! reset by event-driven refetches.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::key::QueryKey;
use crate::store::{QueryStore, StoreEvent};

/// Per-query poll settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub enabled: bool,
}

impl PollConfig {
    pub fn every(interval: Duration) -> Self {
        Self {
            interval,
            enabled: true,
        }
    }

    pub fn disabled() -> Self {
        Self {
            interval: Duration::ZERO,
            enabled: false,
        }
    }
}

struct PollTask {
    cancel: CancellationToken,
    handle: tokio::task::JoinHandle<()>,
}

pub struct PollScheduler {
    store: QueryStore,
    /// Parent of every per-key token.
    cancel: CancellationToken,
    tasks: Mutex<HashMap<QueryKey, PollTask>>,
}

impl PollScheduler {
    pub fn new(store: QueryStore) -> Self {
        Self {
            store,
            cancel: CancellationToken::new(),
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Poll `key` on `config.interval` while it has subscribers.
    ///
    /// Replaces any existing schedule for the key. Returns `false` (and
    /// schedules nothing) when polling is disabled, the interval is zero,
    /// or the key has no live subscriber.
    pub fn schedule(&self, key: QueryKey, config: PollConfig) -> bool {
        if !config.enabled || config.interval.is_zero() {
            tracing::debug!(key = %key, "Polling disabled for query");
            return false;
        }
        if self.store.subscriber_count(&key) == 0 {
            tracing::debug!(key = %key, "Not polling a query without subscribers");
            return false;
        }

        let mut tasks = self.lock();
        tasks.retain(|_, task| !task.handle.is_finished());
        if let Some(previous) = tasks.remove(&key) {
            previous.cancel.cancel();
        }

        let cancel = self.cancel.child_token();
        let handle = tokio::spawn(poll_loop(
            self.store.clone(),
            key.clone(),
            config.interval,
            cancel.clone(),
        ));

        tracing::debug!(key = %key, interval_ms = config.interval.as_millis() as u64, "Polling scheduled");
        tasks.insert(key, PollTask { cancel, handle });
        true
    }

    /// Stop polling `key`. Returns `true` if a schedule existed.
    pub fn cancel(&self, key: &QueryKey) -> bool {
        match self.lock().remove(key) {
            Some(task) => {
                task.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Number of keys currently being polled.
    pub fn active_count(&self) -> usize {
        self.lock()
            .values()
            .filter(|task| !task.handle.is_finished())
            .count()
    }

    pub fn is_scheduled(&self, key: &QueryKey) -> bool {
        self.lock()
            .get(key)
            .is_some_and(|task| !task.handle.is_finished())
    }

    /// Cancel every schedule.
    pub fn shutdown(&self) {
        self.cancel.cancel();
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<QueryKey, PollTask>> {
        self.tasks.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn poll_loop(
    store: QueryStore,
    key: QueryKey,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut events = store.events();
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if store.subscriber_count(&key) == 0 {
                    break;
                }
                tracing::trace!(key = %key, "Poll tick");
                store.refresh(&key);
            }
            event = events.recv() => match event {
                Ok(StoreEvent::Released(released)) if released == key => {
                    if store.subscriber_count(&key) == 0 {
                        break;
                    }
                }
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            },
        }
    }

    tracing::debug!(key = %key, "Polling stopped");
}
