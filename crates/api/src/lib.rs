//! REST client for the Fly8 admin backend.
//!
//! [`ApiClient`] attaches the bearer token from the persisted session to
//! every request, bounds each request with a timeout, and reacts to an
//! authorization failure by clearing the session and firing the
//! unauthenticated hooks. Endpoint wrappers live in one module per
//! resource.
//!
//! Query endpoints return the raw JSON body (after unwrapping single-key
//! envelopes such as `{ "stats": {...} }`) so it can be cached as-is;
//! decoding into `fly8_core::models` happens in the views.

pub mod appointments;
pub mod client;
pub mod error;
pub mod messages;
pub mod notifications;
pub mod students;

pub use client::{ApiClient, UnauthenticatedHook};
pub use error::ApiError;
pub use notifications::NotificationFilters;
pub use students::StudentFilters;
