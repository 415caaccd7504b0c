//! QueryStore behaviour: de-duplication, stale-while-revalidate, prefix
//! invalidation, out-of-order rejection, error retention, and GC.

mod common;

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use common::{eventually, CountingFetcher, FailingFetcher, GatedFetcher, HangingFetcher};
use fly8_cache::{FetchError, QueryKey, QueryPrefix, QueryStore, StoreEvent};
use serde_json::json;

fn messages_key() -> QueryKey {
    QueryKey::new("messages").with_id("conv-1")
}

// ---------------------------------------------------------------------------
// De-duplication
// ---------------------------------------------------------------------------

#[tokio::test]
async fn invalidations_during_fetch_cause_exactly_one_refetch() {
    let fetcher = GatedFetcher::new();
    let store = QueryStore::new(fetcher.clone());
    let key = messages_key();

    let _sub = store.subscribe(key.clone());
    eventually(|| fetcher.calls() == 1).await;

    store.invalidate(&QueryPrefix::from(&key));
    store.invalidate(&QueryPrefix::kind("messages"));
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(fetcher.calls(), 1, "no second fetch while one is in flight");

    fetcher.release(1);
    eventually(|| fetcher.calls() == 2).await;
    // Result of the first fetch is visible but still stale.
    assert!(store.get(&key).is_stale);

    fetcher.release(1);
    eventually(|| !store.get(&key).is_fetching).await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(fetcher.calls(), 2);
    let entry = store.get(&key);
    assert_eq!(entry.data, Some(json!({ "call": 2 })));
    assert!(!entry.is_stale);
}

#[tokio::test]
async fn refresh_during_fetch_is_skipped() {
    let fetcher = GatedFetcher::new();
    let store = QueryStore::new(fetcher.clone());
    let key = messages_key();

    let _sub = store.subscribe(key.clone());
    eventually(|| fetcher.calls() == 1).await;

    assert!(!store.refresh(&key));
    fetcher.release(1);
    eventually(|| !store.get(&key).is_fetching).await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn set_fetching_claims_in_flight_marker_once() {
    let store = QueryStore::new(CountingFetcher::new());
    let key = messages_key();

    let first = store.set_fetching(&key);
    assert!(first.is_some());
    assert!(store.set_fetching(&key).is_none());

    let entry = store.get(&key);
    assert!(entry.is_fetching);
    assert!(entry.error.is_none());
}

// ---------------------------------------------------------------------------
// Stale-while-revalidate
// ---------------------------------------------------------------------------

#[tokio::test]
async fn invalidated_entry_keeps_previous_data() {
    let fetcher = GatedFetcher::new();
    let store = QueryStore::new(fetcher.clone());
    let key = messages_key();

    store.set_data(&key, json!("X"));
    let _sub = store.subscribe(key.clone());
    assert_eq!(fetcher.calls(), 0, "fresh data is not refetched on subscribe");

    store.invalidate(&QueryPrefix::from(&key));
    eventually(|| fetcher.calls() == 1).await;

    let entry = store.get(&key);
    assert_eq!(entry.data, Some(json!("X")));
    assert!(entry.is_stale);
    assert!(entry.is_fetching);
    assert!(!entry.is_loading());

    fetcher.release(1);
    eventually(|| !store.get(&key).is_stale).await;
    assert_eq!(store.get(&key).data, Some(json!({ "call": 1 })));
}

#[tokio::test]
async fn failed_fetch_keeps_data_and_sets_error() {
    let store = QueryStore::new(Arc::new(FailingFetcher));
    let key = QueryKey::new("studentStats");

    store.set_data(&key, json!({ "total": 4 }));
    let _sub = store.subscribe(key.clone());
    assert!(store.refresh(&key));
    eventually(|| store.get(&key).error.is_some()).await;

    let entry = store.get(&key);
    assert_eq!(entry.data, Some(json!({ "total": 4 })));
    assert!(!entry.is_fetching);
    assert_matches!(entry.error, Some(FetchError::Status { status: 500, .. }));
}

#[tokio::test(start_paused = true)]
async fn slow_fetch_times_out_into_error() {
    let store = QueryStore::with_timeout(Arc::new(HangingFetcher), Duration::from_secs(30));
    let key = QueryKey::new("todayAppointments");

    let _sub = store.subscribe(key.clone());
    assert!(store.get(&key).is_loading());

    tokio::time::sleep(Duration::from_secs(31)).await;

    let entry = store.get(&key);
    assert_eq!(entry.error, Some(FetchError::Timeout));
    assert!(!entry.is_fetching);
    assert!(entry.data.is_none());
}

// ---------------------------------------------------------------------------
// Prefix invalidation and lazy revalidation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn prefix_invalidation_marks_only_matching_kind() {
    let fetcher = CountingFetcher::new();
    let store = QueryStore::new(fetcher.clone());
    let page1 = QueryKey::new("students").with_filter("page", 1);
    let page2 = QueryKey::new("students").with_filter("page", 2);
    let messages = messages_key();

    for key in [&page1, &page2, &messages] {
        store.set_data(key, json!([]));
    }

    let matched = store.invalidate(&QueryPrefix::kind("students"));

    assert_eq!(matched, 2);
    assert!(store.get(&page1).is_stale);
    assert!(store.get(&page2).is_stale);
    assert!(!store.get(&messages).is_stale);
    // Nobody is watching: no fetch until the next subscription.
    assert_eq!(fetcher.calls(), 0);

    let _sub = store.subscribe(page1.clone());
    eventually(|| !store.get(&page1).is_stale).await;
    assert_eq!(fetcher.calls(), 1);
    assert!(store.get(&page2).is_stale);
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

#[tokio::test]
async fn response_older_than_direct_write_is_discarded() {
    let store = QueryStore::new(CountingFetcher::new());
    let key = QueryKey::new("conversations");

    let generation = store.set_fetching(&key).unwrap();
    store.set_data(&key, json!(["newer"]));

    let applied = store.complete_fetch(&key, generation, Ok(json!(["older"])));

    assert!(!applied);
    let entry = store.get(&key);
    assert_eq!(entry.data, Some(json!(["newer"])));
    assert!(!entry.is_fetching);
}

#[tokio::test]
async fn late_result_after_last_unsubscribe_still_updates_cache() {
    let fetcher = GatedFetcher::new();
    let store = QueryStore::new(fetcher.clone());
    let key = QueryKey::new("notifications");

    let sub = store.subscribe(key.clone());
    eventually(|| fetcher.calls() == 1).await;
    drop(sub);
    assert_eq!(store.subscriber_count(&key), 0);

    fetcher.release(1);
    eventually(|| store.get(&key).data.is_some()).await;
    assert!(store.get(&key).error.is_none());
}

#[tokio::test]
async fn invalidation_during_unobserved_fetch_survives_the_late_result() {
    let fetcher = GatedFetcher::new();
    let store = QueryStore::new(fetcher.clone());
    let key = QueryKey::new("conversations");

    let sub = store.subscribe(key.clone());
    eventually(|| fetcher.calls() == 1).await;
    drop(sub);

    store.invalidate(&QueryPrefix::kind("conversations"));
    fetcher.release(1);
    eventually(|| !store.get(&key).is_fetching).await;

    let entry = store.get(&key);
    assert_eq!(entry.data, Some(json!({ "call": 1 })));
    assert!(entry.is_stale, "result fetched before the invalidation is not fresh");
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(fetcher.calls(), 1, "no refetch without a subscriber");

    let _sub = store.subscribe(key.clone());
    eventually(|| fetcher.calls() == 2).await;
    fetcher.release(1);
    eventually(|| !store.get(&key).is_stale).await;
    assert_eq!(store.get(&key).data, Some(json!({ "call": 2 })));
}

// ---------------------------------------------------------------------------
// Subscriptions and events
// ---------------------------------------------------------------------------

#[tokio::test]
async fn subscription_observes_fetched_data() {
    let store = QueryStore::new(CountingFetcher::new());
    let mut sub = store.subscribe(QueryKey::new("messageStats"));

    while sub.entry().data.is_none() {
        assert!(sub.changed().await);
    }

    assert_eq!(sub.data(), Some(json!({ "call": 1 })));
}

#[tokio::test]
async fn last_release_is_broadcast() {
    let store = QueryStore::new(CountingFetcher::new());
    let key = QueryKey::new("studentStats");
    let mut events = store.events();

    let a = store.subscribe(key.clone());
    let b = store.subscribe(key.clone());
    assert_eq!(store.subscriber_count(&key), 2);
    drop(a);
    drop(b);

    let released = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            if let StoreEvent::Released(k) = events.recv().await.unwrap() {
                return k;
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(released, key);
}

// ---------------------------------------------------------------------------
// Garbage collection
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn idle_unsubscribed_entries_are_collected() {
    let store = QueryStore::new(CountingFetcher::new());
    let idle = QueryKey::new("students").with_filter("page", 9);
    let watched = QueryKey::new("studentStats");

    store.set_data(&idle, json!([]));
    let _sub = store.subscribe(watched.clone());
    let max_idle = Duration::from_secs(300);

    assert_eq!(store.collect_garbage(max_idle), 0);

    tokio::time::sleep(Duration::from_secs(301)).await;

    assert_eq!(store.collect_garbage(max_idle), 1);
    assert_eq!(store.len(), 1);
    assert_eq!(store.subscriber_count(&watched), 1);
}
