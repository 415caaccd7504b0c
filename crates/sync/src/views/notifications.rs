//! Notification list and unread badge.

use std::collections::{BTreeMap, HashMap};

use fly8_core::models::{Notification, NotificationType};
use fly8_core::pagination::{PageInfo, Paginated};
use fly8_core::types::EntityId;
use serde_json::Value;

/// Notifications newest first, de-duplicated by id.
#[derive(Debug, Default)]
pub struct NotificationView {
    items: Vec<Notification>,
    pagination: PageInfo,
    filter: Option<NotificationType>,
    /// Fed from a `status=unread` query.
    unread_scope: bool,
}

impl NotificationView {
    pub fn new() -> Self {
        Self::default()
    }

    /// A view over the unread-filtered notification query, as used by
    /// the header badge.
    pub fn unread_only() -> Self {
        Self {
            unread_scope: true,
            ..Self::default()
        }
    }

    /// Re-derive from a notifications payload.
    pub fn apply(&mut self, data: &Value) -> Result<(), serde_json::Error> {
        let page: Paginated<Notification> = Paginated::from_value(data, "notifications")?;

        let mut by_id: HashMap<EntityId, Notification> = HashMap::new();
        for notification in page.items {
            by_id.insert(notification.id.clone(), notification);
        }

        let mut items: Vec<Notification> = by_id.into_values().collect();
        items.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        self.items = items;
        self.pagination = page.pagination;
        Ok(())
    }

    /// Count of unread notifications in the cached list. Drives the
    /// header badge.
    pub fn unread_count(&self) -> usize {
        self.items.iter().filter(|n| n.is_unread()).count()
    }

    /// Unread total for the header badge.
    ///
    /// An unread-scoped view reports the server's `pagination.total`,
    /// which covers pages beyond the cached one. Otherwise this is the
    /// cached count.
    pub fn unread_total(&self) -> u64 {
        if self.unread_scope {
            self.pagination.total
        } else {
            self.unread_count() as u64
        }
    }

    pub fn set_filter(&mut self, kind: Option<NotificationType>) {
        self.filter = kind;
    }

    pub fn filter(&self) -> Option<NotificationType> {
        self.filter
    }

    /// Notifications passing the current type filter.
    pub fn visible(&self) -> Vec<&Notification> {
        self.items
            .iter()
            .filter(|n| self.filter.map_or(true, |kind| n.kind == kind))
            .collect()
    }

    pub fn all(&self) -> &[Notification] {
        &self.items
    }

    pub fn pagination(&self) -> &PageInfo {
        &self.pagination
    }

    /// Number of cached notifications per type.
    pub fn counts_by_type(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for n in &self.items {
            *counts.entry(n.kind.as_str()).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn notification(id: &str, kind: &str, status: &str, at: &str) -> Value {
        json!({
            "_id": id, "title": id, "message": "",
            "type": kind, "priority": "high",
            "status": status, "createdAt": at
        })
    }

    #[test]
    fn unread_count_tracks_cached_statuses() {
        let mut view = NotificationView::new();
        view.apply(&json!({ "notifications": [
            notification("n1", "info", "unread", "2024-03-01T10:00:00Z"),
            notification("n2", "info", "unread", "2024-03-01T11:00:00Z"),
            notification("n3", "message", "unread", "2024-03-01T12:00:00Z"),
            notification("n4", "system", "read", "2024-03-01T13:00:00Z"),
            notification("n5", "system", "read", "2024-03-01T14:00:00Z"),
        ], "pagination": { "total": 5, "pages": 1 } }))
        .unwrap();
        assert_eq!(view.unread_count(), 3);

        view.apply(&json!({ "notifications": [
            notification("n1", "info", "read", "2024-03-01T10:00:00Z"),
            notification("n2", "info", "read", "2024-03-01T11:00:00Z"),
            notification("n3", "message", "read", "2024-03-01T12:00:00Z"),
            notification("n4", "system", "read", "2024-03-01T13:00:00Z"),
            notification("n5", "system", "read", "2024-03-01T14:00:00Z"),
        ]}))
        .unwrap();
        assert_eq!(view.unread_count(), 0);
    }

    #[test]
    fn unread_badge_uses_server_total_beyond_the_page() {
        let page: Vec<Value> = (0..20)
            .map(|i| notification(&format!("n{i}"), "info", "unread", "2024-03-01T10:00:00Z"))
            .collect();
        let body = json!({
            "notifications": page,
            "pagination": { "total": 57, "pages": 3, "page": 1, "limit": 20 },
        });

        let mut badge = NotificationView::unread_only();
        badge.apply(&body).unwrap();
        assert_eq!(badge.unread_count(), 20);
        assert_eq!(badge.unread_total(), 57);

        badge
            .apply(&json!({ "notifications": [], "pagination": { "total": 0, "pages": 0 } }))
            .unwrap();
        assert_eq!(badge.unread_total(), 0);

        let mut list = NotificationView::new();
        list.apply(&body).unwrap();
        assert_eq!(list.unread_total(), 20);
    }

    #[test]
    fn sorted_newest_first_and_deduplicated() {
        let mut view = NotificationView::new();
        view.apply(&json!([
            notification("n1", "info", "unread", "2024-03-01T10:00:00Z"),
            notification("n2", "info", "unread", "2024-03-02T10:00:00Z"),
            notification("n1", "info", "unread", "2024-03-01T10:00:00Z"),
        ]))
        .unwrap();

        let ids: Vec<&str> = view.all().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["n2", "n1"]);
    }

    #[test]
    fn type_filter_limits_visible() {
        let mut view = NotificationView::new();
        view.apply(&json!([
            notification("n1", "appointment", "unread", "2024-03-01T10:00:00Z"),
            notification("n2", "message", "unread", "2024-03-02T10:00:00Z"),
        ]))
        .unwrap();

        view.set_filter(Some(NotificationType::Appointment));
        let visible: Vec<&str> = view.visible().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(visible, vec!["n1"]);

        view.set_filter(None);
        assert_eq!(view.visible().len(), 2);
        assert_eq!(view.counts_by_type().get("message"), Some(&1));
    }
}
