//! REST-backed [`QueryFetcher`].

use std::sync::Arc;

use async_trait::async_trait;
use fly8_api::ApiClient;
use fly8_cache::{FetchError, QueryFetcher, QueryKey};
use serde_json::Value;

use crate::error::to_fetch_error;
use crate::keys;

/// Resolves dashboard query keys to backend endpoints.
pub struct DashboardFetcher {
    api: Arc<ApiClient>,
}

impl DashboardFetcher {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl QueryFetcher for DashboardFetcher {
    async fn fetch(&self, key: &QueryKey) -> Result<Value, FetchError> {
        let api = &self.api;
        let result = match key.kind() {
            keys::STUDENTS => api.list_students(&keys::student_filters(key)).await,
            keys::STUDENT_STATS => api.student_stats().await,
            keys::STUDENT => api.student_detail(require_id(key)?).await,
            keys::MESSAGES => {
                let (page, limit) = keys::thread_page(key);
                api.conversation_messages(require_id(key)?, page, limit)
                    .await
            }
            keys::CONVERSATIONS => api.conversations().await,
            keys::MESSAGE_STATS => api.message_stats().await,
            keys::APPOINTMENT_STATS => api.appointment_stats().await,
            keys::TODAY_APPOINTMENTS => api.today_appointments().await,
            keys::NOTIFICATIONS => api.notifications(&keys::notification_filters(key)).await,
            keys::NOTIFICATION_STATS => api.notification_stats().await,
            other => {
                return Err(FetchError::Failed(format!("unknown query kind `{other}`")));
            }
        };

        result.map_err(to_fetch_error)
    }
}

fn require_id(key: &QueryKey) -> Result<&str, FetchError> {
    key.id()
        .ok_or_else(|| FetchError::Failed(format!("query `{key}` needs an id")))
}
