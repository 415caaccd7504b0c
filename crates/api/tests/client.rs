//! ApiClient against an in-process axum backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use fly8_api::{ApiClient, ApiError, StudentFilters};
use fly8_core::models::SendMessage;
use fly8_core::session::{AdminProfile, MemorySessionStore, Session, SessionStore};
use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// Mock backend
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
struct Seen {
    auth: Arc<Mutex<Vec<Option<String>>>>,
    queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

fn record_auth(seen: &Seen, headers: &HeaderMap) {
    let value = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    seen.auth.lock().unwrap().push(value);
}

async fn student_stats(State(seen): State<Seen>, headers: HeaderMap) -> Json<Value> {
    record_auth(&seen, &headers);
    Json(json!({ "success": true, "stats": { "total": 12, "active": 9 } }))
}

async fn students(
    State(seen): State<Seen>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    seen.queries.lock().unwrap().push(query);
    Json(json!({ "students": [], "pagination": { "total": 0, "pages": 0 } }))
}

async fn unauthorized() -> (StatusCode, Json<Value>) {
    (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Token expired" })))
}

async fn missing() -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(json!({ "message": "Student not found" })))
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(2)).await;
    Json(json!({}))
}

async fn send(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({ "success": true, "message": { "content": body["content"] } }))
}

async fn spawn_backend(seen: Seen) -> String {
    let app = Router::new()
        .route("/admin/students", get(students))
        .route("/admin/students/stats", get(student_stats))
        .route("/admin/students/{id}", get(missing))
        .route("/admin/notifications/stats", get(unauthorized))
        .route("/admin/appointments/today", get(slow))
        .route("/admin/messages/send", post(send))
        .route("/admin/notifications/mark-all-read", put(|| async { StatusCode::NO_CONTENT }))
        .with_state(seen);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn logged_in() -> Arc<MemorySessionStore> {
    Arc::new(MemorySessionStore::with_session(Session {
        token: "tok-abc".into(),
        user: AdminProfile {
            id: "admin-1".into(),
            first_name: "Ada".into(),
            last_name: "Admin".into(),
            email: "ada@fly8.test".into(),
            role: None,
        },
    }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stats_are_unwrapped_and_bearer_is_sent() {
    let seen = Seen::default();
    let base = spawn_backend(seen.clone()).await;
    let client = ApiClient::new(base, Duration::from_secs(5), logged_in()).unwrap();

    let stats = client.student_stats().await.unwrap();

    assert_eq!(stats, json!({ "total": 12, "active": 9 }));
    assert_eq!(
        *seen.auth.lock().unwrap(),
        vec![Some("Bearer tok-abc".to_string())]
    );
}

#[tokio::test]
async fn no_session_means_no_authorization_header() {
    let seen = Seen::default();
    let base = spawn_backend(seen.clone()).await;
    let session: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::default());
    let client = ApiClient::new(base, Duration::from_secs(5), session).unwrap();

    client.student_stats().await.unwrap();

    assert_eq!(*seen.auth.lock().unwrap(), vec![None]);
}

#[tokio::test]
async fn list_sends_filters_as_query() {
    let seen = Seen::default();
    let base = spawn_backend(seen.clone()).await;
    let client = ApiClient::new(base, Duration::from_secs(5), logged_in()).unwrap();

    let filters = StudentFilters {
        page: 3,
        search: Some("obi".into()),
        ..Default::default()
    };
    let body = client.list_students(&filters).await.unwrap();

    assert_eq!(body["pagination"]["total"], 0);
    let queries = seen.queries.lock().unwrap();
    assert_eq!(queries[0].get("page").map(String::as_str), Some("3"));
    assert_eq!(queries[0].get("search").map(String::as_str), Some("obi"));
    assert!(!queries[0].contains_key("status"));
}

#[tokio::test]
async fn unauthorized_clears_session_and_fires_hook() {
    let base = spawn_backend(Seen::default()).await;
    let session = logged_in();
    let client = ApiClient::new(base, Duration::from_secs(5), session.clone()).unwrap();

    let fired = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fired);
    client.on_unauthenticated(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let result = client.notification_stats().await;

    assert_matches!(result, Err(ApiError::Unauthorized));
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert!(session.load().unwrap().is_none());
}

#[tokio::test]
async fn error_status_carries_server_message() {
    let base = spawn_backend(Seen::default()).await;
    let client = ApiClient::new(base, Duration::from_secs(5), logged_in()).unwrap();

    let result = client.student_detail("missing-id").await;

    assert_matches!(result, Err(ApiError::Api { status: 404, ref message }) if message == "Student not found");
}

#[tokio::test]
async fn slow_response_times_out() {
    let base = spawn_backend(Seen::default()).await;
    let client = ApiClient::new(base, Duration::from_millis(100), logged_in()).unwrap();

    let result = client.today_appointments().await;

    assert_matches!(result, Err(ApiError::Timeout));
}

#[tokio::test]
async fn send_message_validates_before_sending() {
    let base = spawn_backend(Seen::default()).await;
    let client = ApiClient::new(base, Duration::from_secs(5), logged_in()).unwrap();

    let empty = SendMessage {
        student_id: "s1".into(),
        content: String::new(),
    };
    assert_matches!(client.send_message(&empty).await, Err(ApiError::Validation(_)));

    let ok = SendMessage {
        student_id: "s1".into(),
        content: "Your visa is approved".into(),
    };
    let body = client.send_message(&ok).await.unwrap();
    assert_eq!(body["message"]["content"], "Your visa is approved");
}

#[tokio::test]
async fn empty_success_body_is_null() {
    let base = spawn_backend(Seen::default()).await;
    let client = ApiClient::new(base, Duration::from_secs(5), logged_in()).unwrap();

    let body = client.mark_all_notifications_read().await.unwrap();

    assert_eq!(body, Value::Null);
}
