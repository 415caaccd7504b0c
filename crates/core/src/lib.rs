//! Shared building blocks for the Fly8 live dashboard.
//!
//! This crate has zero internal dependencies so that the channel, API,
//! cache and sync crates can all lean on the same domain types.

pub mod error;
pub mod models;
pub mod pagination;
pub mod session;
pub mod time_ago;
pub mod types;
