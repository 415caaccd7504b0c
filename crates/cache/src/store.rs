//! The cached query store.
//!
//! One [`Slot`] per [`QueryKey`] holds the public [`CacheEntry`] plus the
//! bookkeeping that enforces:
//!
//! - at most one in-flight fetch per key (`in_flight`);
//! - one follow-up fetch when the key is invalidated during a fetch
//!   (`refetch_pending`);
//! - no response applied after a newer write (`applied` generation).
//!
//! All slot state sits behind one synchronous mutex that is never held
//! across an `.await`, so the check-and-set of `in_flight` is atomic.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tokio::sync::{broadcast, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::entry::{CacheEntry, FetchError};
use crate::fetcher::QueryFetcher;
use crate::key::{QueryKey, QueryPrefix};

/// Default bound on a single fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Broadcast channel capacity for store events.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Store-wide notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// The entry for this key changed.
    Updated(QueryKey),
    /// The last subscriber for this key went away.
    Released(QueryKey),
}

struct Slot {
    entry: CacheEntry,
    tx: watch::Sender<CacheEntry>,
    subscribers: usize,
    /// Last generation handed out by `set_fetching` or `set_data`.
    issued: u64,
    /// Generation of the last write applied to `entry.data`.
    applied: u64,
    in_flight: Option<u64>,
    refetch_pending: bool,
    last_used: Instant,
}

impl Slot {
    fn new(key: QueryKey) -> Self {
        let entry = CacheEntry::empty(key);
        let (tx, _) = watch::channel(entry.clone());
        Self {
            entry,
            tx,
            subscribers: 0,
            issued: 0,
            applied: 0,
            in_flight: None,
            refetch_pending: false,
            last_used: Instant::now(),
        }
    }

    fn publish(&self) {
        self.tx.send_replace(self.entry.clone());
    }

    /// Claim the in-flight marker. `None` when a fetch is already running.
    fn begin_fetch(&mut self) -> Option<u64> {
        if self.in_flight.is_some() {
            return None;
        }
        self.issued += 1;
        self.in_flight = Some(self.issued);
        self.entry.is_fetching = true;
        self.entry.error = None;
        Some(self.issued)
    }

    fn apply_data(&mut self, generation: u64, data: Value) {
        self.applied = generation;
        self.entry.data = Some(data);
        self.entry.fetched_at = Some(Utc::now());
        self.entry.is_stale = false;
        self.entry.error = None;
    }
}

struct Inner {
    slots: Mutex<HashMap<QueryKey, Slot>>,
    fetcher: Arc<dyn QueryFetcher>,
    events: broadcast::Sender<StoreEvent>,
    fetch_timeout: Duration,
}

/// Shared handle to the cache. Cloning is cheap; clones share state.
///
/// Operations that may start a fetch spawn onto the current Tokio
/// runtime.
#[derive(Clone)]
pub struct QueryStore {
    inner: Arc<Inner>,
}

impl QueryStore {
    pub fn new(fetcher: Arc<dyn QueryFetcher>) -> Self {
        Self::with_timeout(fetcher, DEFAULT_FETCH_TIMEOUT)
    }

    pub fn with_timeout(fetcher: Arc<dyn QueryFetcher>, fetch_timeout: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                slots: Mutex::new(HashMap::new()),
                fetcher,
                events,
                fetch_timeout,
            }),
        }
    }

    /// Subscribe to store-wide events.
    pub fn events(&self) -> broadcast::Receiver<StoreEvent> {
        self.inner.events.subscribe()
    }

    // ---- transitions ----

    /// Current entry for `key`, creating an empty stale one if absent.
    pub fn get(&self, key: &QueryKey) -> CacheEntry {
        let mut slots = self.lock();
        let slot = slot_mut(&mut slots, key);
        slot.last_used = Instant::now();
        slot.entry.clone()
    }

    /// Mark `key` as fetching and return the request generation, or
    /// `None` if a fetch is already in flight.
    ///
    /// Pair with [`complete_fetch`](Self::complete_fetch).
    pub fn set_fetching(&self, key: &QueryKey) -> Option<u64> {
        let mut slots = self.lock();
        let slot = slot_mut(&mut slots, key);
        let generation = slot.begin_fetch()?;
        slot.publish();
        drop(slots);
        self.emit(StoreEvent::Updated(key.clone()));
        Some(generation)
    }

    /// Write `data` directly. Counts as the newest write for the key: a
    /// fetch issued earlier will be discarded when it completes.
    pub fn set_data(&self, key: &QueryKey, data: Value) {
        let mut slots = self.lock();
        let slot = slot_mut(&mut slots, key);
        slot.issued += 1;
        let generation = slot.issued;
        slot.apply_data(generation, data);
        slot.publish();
        drop(slots);
        self.emit(StoreEvent::Updated(key.clone()));
    }

    /// Record a failure. Keeps any previous data and clears the
    /// fetching flag.
    pub fn set_error(&self, key: &QueryKey, error: FetchError) {
        let mut slots = self.lock();
        let slot = slot_mut(&mut slots, key);
        slot.entry.error = Some(error);
        slot.entry.is_fetching = false;
        slot.in_flight = None;
        slot.publish();
        drop(slots);
        self.emit(StoreEvent::Updated(key.clone()));
    }

    /// Apply the result of the fetch issued as `generation`.
    ///
    /// Returns `false` when the result was discarded because a newer
    /// write has already been applied. Triggers the follow-up fetch if
    /// the key was invalidated while this one was in flight.
    pub fn complete_fetch(
        &self,
        key: &QueryKey,
        generation: u64,
        result: Result<Value, FetchError>,
    ) -> bool {
        let mut slots = self.lock();
        let Some(slot) = slots.get_mut(key) else {
            tracing::debug!(key = %key, "Fetch completed for collected key");
            return false;
        };

        if slot.in_flight == Some(generation) {
            slot.in_flight = None;
            slot.entry.is_fetching = false;
        }

        let applied = if generation <= slot.applied {
            tracing::debug!(
                key = %key,
                generation,
                applied = slot.applied,
                "Discarding out-of-order fetch response",
            );
            false
        } else {
            match result {
                Ok(data) => {
                    slot.apply_data(generation, data);
                    // Invalidated again while this fetch was running.
                    if slot.refetch_pending {
                        slot.entry.is_stale = true;
                    }
                }
                Err(e) => {
                    if slot.subscribers > 0 {
                        tracing::warn!(key = %key, error = %e, "Query fetch failed");
                    } else {
                        tracing::debug!(key = %key, error = %e, "Unobserved query fetch failed");
                    }
                    slot.entry.error = Some(e);
                }
            }
            true
        };

        if slot.refetch_pending && slot.in_flight.is_none() {
            slot.refetch_pending = false;
            if slot.subscribers > 0 {
                self.start_fetch(key, slot);
            }
        }

        slot.publish();
        drop(slots);
        self.emit(StoreEvent::Updated(key.clone()));
        applied
    }

    /// Mark every entry matching `prefix` stale.
    ///
    /// Entries with a live subscriber are refetched now, or once the
    /// running fetch completes. Entries without one stay stale, even if a
    /// fetch issued earlier lands afterwards, and are refetched on their
    /// next subscription. Returns the number of entries matched.
    pub fn invalidate(&self, prefix: &QueryPrefix) -> usize {
        let mut slots = self.lock();
        let mut touched = Vec::new();

        for (key, slot) in slots.iter_mut() {
            if !prefix.matches(key) {
                continue;
            }
            slot.entry.is_stale = true;
            if slot.in_flight.is_some() {
                // The running fetch predates this invalidation.
                slot.refetch_pending = true;
            } else if slot.subscribers > 0 {
                self.start_fetch(key, slot);
            }
            slot.publish();
            touched.push(key.clone());
        }
        drop(slots);

        tracing::debug!(prefix = %prefix, matched = touched.len(), "Invalidated queries");
        for key in &touched {
            self.emit(StoreEvent::Updated(key.clone()));
        }
        touched.len()
    }

    /// Refetch `key` now unless a fetch is already in flight.
    ///
    /// Used by the poll scheduler; does not change staleness and never
    /// queues a follow-up. Returns `true` if a fetch was started.
    pub fn refresh(&self, key: &QueryKey) -> bool {
        let mut slots = self.lock();
        let slot = slot_mut(&mut slots, key);
        if slot.in_flight.is_some() {
            tracing::trace!(key = %key, "Fetch in flight, skipping refresh");
            return false;
        }
        self.start_fetch(key, slot);
        slot.publish();
        drop(slots);
        self.emit(StoreEvent::Updated(key.clone()));
        true
    }

    // ---- subscriptions ----

    /// Register interest in `key`. A stale or never-fetched entry is
    /// fetched immediately.
    pub fn subscribe(&self, key: QueryKey) -> Subscription {
        let mut slots = self.lock();
        let slot = slot_mut(&mut slots, &key);
        slot.subscribers += 1;
        slot.last_used = Instant::now();

        if slot.entry.is_stale && slot.in_flight.is_none() {
            self.start_fetch(&key, slot);
            slot.publish();
        }
        let rx = slot.tx.subscribe();
        drop(slots);

        Subscription {
            store: self.clone(),
            key,
            rx,
        }
    }

    pub fn subscriber_count(&self, key: &QueryKey) -> usize {
        self.lock().get(key).map_or(0, |slot| slot.subscribers)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Snapshot of every entry matching `prefix`, ordered by key.
    pub fn entries_matching(&self, prefix: &QueryPrefix) -> Vec<CacheEntry> {
        let slots = self.lock();
        let mut entries: Vec<CacheEntry> = slots
            .iter()
            .filter(|(key, _)| prefix.matches(key))
            .map(|(_, slot)| slot.entry.clone())
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        entries
    }

    // ---- garbage collection ----

    /// Remove entries with no subscribers, no fetch in flight, and no use
    /// for at least `max_idle`. Returns the number removed.
    pub fn collect_garbage(&self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let mut slots = self.lock();
        let before = slots.len();
        slots.retain(|_, slot| {
            slot.subscribers > 0
                || slot.in_flight.is_some()
                || now.duration_since(slot.last_used) < max_idle
        });
        let removed = before - slots.len();
        if removed > 0 {
            tracing::debug!(removed, remaining = slots.len(), "Collected idle cache entries");
        }
        removed
    }

    /// Run [`collect_garbage`](Self::collect_garbage) every `interval`
    /// until `cancel` fires.
    pub fn spawn_gc(
        &self,
        interval: Duration,
        max_idle: Duration,
        cancel: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        store.collect_garbage(max_idle);
                    }
                }
            }
        })
    }

    // ---- private helpers ----

    fn lock(&self) -> MutexGuard<'_, HashMap<QueryKey, Slot>> {
        self.inner.slots.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn emit(&self, event: StoreEvent) {
        // No receivers is fine.
        let _ = self.inner.events.send(event);
    }

    /// Claim the in-flight marker and spawn the fetch. Called with the
    /// slot lock held; the spawned task takes the lock only after the
    /// fetch resolves.
    fn start_fetch(&self, key: &QueryKey, slot: &mut Slot) {
        let Some(generation) = slot.begin_fetch() else {
            return;
        };

        let store = self.clone();
        let key = key.clone();
        tokio::spawn(async move {
            let timeout = store.inner.fetch_timeout;
            let result =
                match tokio::time::timeout(timeout, store.inner.fetcher.fetch(&key)).await {
                    Ok(result) => result,
                    Err(_) => Err(FetchError::Timeout),
                };
            store.complete_fetch(&key, generation, result);
        });
    }

    fn release(&self, key: &QueryKey) {
        let mut slots = self.lock();
        let Some(slot) = slots.get_mut(key) else {
            return;
        };
        slot.subscribers = slot.subscribers.saturating_sub(1);
        slot.last_used = Instant::now();
        let released = slot.subscribers == 0;
        drop(slots);

        if released {
            tracing::trace!(key = %key, "Last subscriber released");
            self.emit(StoreEvent::Released(key.clone()));
        }
    }
}

fn slot_mut<'a>(slots: &'a mut HashMap<QueryKey, Slot>, key: &QueryKey) -> &'a mut Slot {
    slots
        .entry(key.clone())
        .or_insert_with(|| Slot::new(key.clone()))
}

/// A live interest in one key. Dropping it releases the interest.
pub struct Subscription {
    store: QueryStore,
    key: QueryKey,
    rx: watch::Receiver<CacheEntry>,
}

impl Subscription {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Latest entry snapshot.
    pub fn entry(&self) -> CacheEntry {
        self.rx.borrow().clone()
    }

    pub fn data(&self) -> Option<Value> {
        self.rx.borrow().data.clone()
    }

    /// Wait until the entry changes. Returns `false` if the entry was
    /// garbage-collected.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// Mark the entry seen so the next [`changed`](Self::changed) waits
    /// for a newer update.
    pub fn mark_seen(&mut self) -> CacheEntry {
        self.rx.borrow_and_update().clone()
    }

    pub fn store(&self) -> &QueryStore {
        &self.store
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.store.release(&self.key);
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("key", &self.key).finish()
    }
}
