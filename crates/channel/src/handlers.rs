//! Per-event-name handler registry.
//!
//! Handlers for one event name run in registration order. Dispatch clones
//! the handler list before invoking, so a handler may register or remove
//! handlers without deadlocking.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use fly8_events::DomainEvent;

/// Callback invoked for each inbound event of a subscribed name.
pub type EventHandler = Arc<dyn Fn(&DomainEvent) + Send + Sync>;

/// Opaque handle returned by [`HandlerRegistry::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

#[derive(Default)]
pub struct HandlerRegistry {
    next_id: AtomicU64,
    handlers: RwLock<HashMap<String, Vec<(HandlerId, EventHandler)>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `event`.
    pub fn add(&self, event: &str, handler: EventHandler) -> HandlerId {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut map = self.handlers.write().unwrap_or_else(|e| e.into_inner());
        map.entry(event.to_string()).or_default().push((id, handler));
        id
    }

    /// Remove one handler, or every handler for `event` when `id` is
    /// `None`. Returns the number removed.
    pub fn remove(&self, event: &str, id: Option<HandlerId>) -> usize {
        let mut map = self.handlers.write().unwrap_or_else(|e| e.into_inner());
        let Some(list) = map.get_mut(event) else {
            return 0;
        };

        let before = list.len();
        match id {
            Some(id) => list.retain(|(hid, _)| *hid != id),
            None => list.clear(),
        }
        let removed = before - list.len();

        if list.is_empty() {
            map.remove(event);
        }
        removed
    }

    /// Invoke every handler registered for `event.name`. Returns the number
    /// of handlers called.
    pub fn dispatch(&self, event: &DomainEvent) -> usize {
        let handlers: Vec<EventHandler> = {
            let map = self.handlers.read().unwrap_or_else(|e| e.into_inner());
            match map.get(&event.name) {
                Some(list) => list.iter().map(|(_, h)| Arc::clone(h)).collect(),
                None => return 0,
            }
        };

        for handler in &handlers {
            handler(event);
        }
        handlers.len()
    }

    pub fn handler_count(&self, event: &str) -> usize {
        let map = self.handlers.read().unwrap_or_else(|e| e.into_inner());
        map.get(event).map_or(0, Vec::len)
    }
}
