//! Shared fetcher doubles.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fly8_cache::{FetchError, QueryFetcher, QueryKey};
use serde_json::{json, Value};
use tokio::sync::Semaphore;

/// Answers `{"call": n}` immediately.
#[derive(Default)]
pub struct CountingFetcher {
    calls: AtomicUsize,
}

impl CountingFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueryFetcher for CountingFetcher {
    async fn fetch(&self, _key: &QueryKey) -> Result<Value, FetchError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(json!({ "call": n }))
    }
}

/// Blocks every fetch until the test releases a permit.
pub struct GatedFetcher {
    calls: AtomicUsize,
    gate: Semaphore,
}

impl GatedFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            gate: Semaphore::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }
}

#[async_trait]
impl QueryFetcher for GatedFetcher {
    async fn fetch(&self, _key: &QueryKey) -> Result<Value, FetchError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.gate.acquire().await.unwrap().forget();
        Ok(json!({ "call": n }))
    }
}

/// Always fails.
pub struct FailingFetcher;

#[async_trait]
impl QueryFetcher for FailingFetcher {
    async fn fetch(&self, _key: &QueryKey) -> Result<Value, FetchError> {
        Err(FetchError::Status {
            status: 500,
            message: "boom".into(),
        })
    }
}

/// Never resolves.
pub struct HangingFetcher;

#[async_trait]
impl QueryFetcher for HangingFetcher {
    async fn fetch(&self, _key: &QueryKey) -> Result<Value, FetchError> {
        std::future::pending().await
    }
}

/// Poll `cond` until it holds, failing the test after ~2s.
pub async fn eventually(mut cond: impl FnMut() -> bool) {
    for _ in 0..400 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached");
}
