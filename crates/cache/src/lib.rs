//! Cached query store and polling fallback scheduler.
//!
//! [`QueryStore`] caches server responses by [`QueryKey`], tracks
//! staleness per entry, de-duplicates fetches (at most one in flight per
//! key), serves the previous data while revalidating, and rejects
//! out-of-order responses using per-key request generations.
//!
//! [`PollScheduler`] refreshes subscribed keys on a fixed cadence,
//! independently of event-driven invalidation.

pub mod entry;
pub mod fetcher;
pub mod key;
pub mod scheduler;
pub mod store;

pub use entry::{CacheEntry, FetchError};
pub use fetcher::QueryFetcher;
pub use key::{QueryKey, QueryPrefix};
pub use scheduler::{PollConfig, PollScheduler};
pub use store::{QueryStore, StoreEvent, Subscription};
