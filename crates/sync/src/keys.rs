//! Query key vocabulary for the dashboard.
//!
//! Each constant is a key *kind*. Builders below produce the concrete
//! keys the views subscribe to; the fetcher parses them back into REST
//! calls.

use fly8_api::{NotificationFilters, StudentFilters};
use fly8_cache::QueryKey;
use fly8_core::models::{NotificationStatus, NotificationType, StudentStatusFilter};

pub const STUDENTS: &str = "students";
pub const STUDENT_STATS: &str = "studentStats";
pub const STUDENT: &str = "student";
pub const MESSAGES: &str = "messages";
pub const CONVERSATIONS: &str = "conversations";
pub const MESSAGE_STATS: &str = "messageStats";
pub const APPOINTMENT_STATS: &str = "appointmentStats";
pub const TODAY_APPOINTMENTS: &str = "todayAppointments";
pub const NOTIFICATIONS: &str = "notifications";
pub const NOTIFICATION_STATS: &str = "notificationStats";

/// Page size for a conversation thread.
pub const THREAD_PAGE_SIZE: u32 = 50;

pub fn students(filters: &StudentFilters) -> QueryKey {
    let mut key = QueryKey::new(STUDENTS)
        .with_filter("page", filters.page)
        .with_filter("limit", filters.limit);
    if let Some(search) = filters.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        key = key.with_filter("search", search);
    }
    if filters.status != StudentStatusFilter::All {
        key = key.with_filter("status", filters.status.as_str());
    }
    key
}

pub fn student(id: &str) -> QueryKey {
    QueryKey::new(STUDENT).with_id(id)
}

pub fn messages(conversation_id: &str) -> QueryKey {
    QueryKey::new(MESSAGES)
        .with_id(conversation_id)
        .with_filter("page", 1)
        .with_filter("limit", THREAD_PAGE_SIZE)
}

pub fn conversations() -> QueryKey {
    QueryKey::new(CONVERSATIONS)
}

pub fn notifications(filters: &NotificationFilters) -> QueryKey {
    let mut key = QueryKey::new(NOTIFICATIONS)
        .with_filter("page", filters.page)
        .with_filter("limit", filters.limit);
    if let Some(status) = filters.status {
        key = key.with_filter("status", status.as_str());
    }
    if let Some(kind) = filters.kind {
        key = key.with_filter("type", kind.as_str());
    }
    key
}

pub fn student_stats() -> QueryKey {
    QueryKey::new(STUDENT_STATS)
}

pub fn message_stats() -> QueryKey {
    QueryKey::new(MESSAGE_STATS)
}

pub fn appointment_stats() -> QueryKey {
    QueryKey::new(APPOINTMENT_STATS)
}

pub fn today_appointments() -> QueryKey {
    QueryKey::new(TODAY_APPOINTMENTS)
}

pub fn notification_stats() -> QueryKey {
    QueryKey::new(NOTIFICATION_STATS)
}

// ---- key -> request parameters ----

/// Rebuild student list filters from a `students` key. Unparseable values
/// fall back to the defaults.
pub fn student_filters(key: &QueryKey) -> StudentFilters {
    let defaults = StudentFilters::default();
    StudentFilters {
        page: parse_or(key.filter("page"), defaults.page),
        limit: parse_or(key.filter("limit"), defaults.limit),
        search: key.filter("search").map(str::to_string),
        status: match key.filter("status") {
            Some("active") => StudentStatusFilter::Active,
            Some("inactive") => StudentStatusFilter::Inactive,
            _ => StudentStatusFilter::All,
        },
    }
}

pub fn notification_filters(key: &QueryKey) -> NotificationFilters {
    let defaults = NotificationFilters::default();
    NotificationFilters {
        page: parse_or(key.filter("page"), defaults.page),
        limit: parse_or(key.filter("limit"), defaults.limit),
        status: key.filter("status").and_then(parse_enum::<NotificationStatus>),
        kind: key.filter("type").and_then(parse_enum::<NotificationType>),
    }
}

/// `(page, limit)` of a `messages` key.
pub fn thread_page(key: &QueryKey) -> (u32, u32) {
    (
        parse_or(key.filter("page"), 1),
        parse_or(key.filter("limit"), THREAD_PAGE_SIZE),
    )
}

fn parse_or(raw: Option<&str>, default: u32) -> u32 {
    raw.and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Decode a lowercase wire name through the enum's serde impl.
fn parse_enum<T: serde::de::DeserializeOwned>(raw: &str) -> Option<T> {
    serde_json::from_value(serde_json::Value::String(raw.to_string())).ok()
}
