//! Live synchronization layer for the Fly8 admin dashboard.
//!
//! Routes channel events to cache invalidations, resolves query keys to
//! REST calls, runs mutations with post-success invalidation, and derives
//! the conversation, notification and student views from cached data.
//! [`LiveDashboard`] wires it all together for one admin session.

pub mod config;
pub mod debounce;
pub mod error;
pub mod fetcher;
pub mod keys;
pub mod live;
pub mod mutations;
pub mod router;
pub mod views;

pub use config::SyncConfig;
pub use debounce::Debouncer;
pub use error::SyncError;
pub use fetcher::DashboardFetcher;
pub use live::LiveDashboard;
pub use mutations::Mutations;
pub use router::{InvalidationRouter, RouterGuard};
