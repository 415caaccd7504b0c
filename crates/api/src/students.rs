//! `/admin/students` endpoints.

use fly8_core::models::{StudentStatusFilter, StudentStatusUpdate};
use serde_json::Value;

use crate::client::{unwrap_envelope, ApiClient};
use crate::error::ApiError;

/// Query parameters for the student list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentFilters {
    pub page: u32,
    pub limit: u32,
    pub search: Option<String>,
    pub status: StudentStatusFilter,
}

impl Default for StudentFilters {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 10,
            search: None,
            status: StudentStatusFilter::All,
        }
    }
}

impl StudentFilters {
    /// Query string pairs. Blank search and the `all` status are omitted.
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![("page", self.page.to_string()), ("limit", self.limit.to_string())];
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            query.push(("search", search.to_string()));
        }
        if self.status != StudentStatusFilter::All {
            query.push(("status", self.status.as_str().to_string()));
        }
        query
    }
}

impl ApiClient {
    /// `GET /admin/students`. Returns the paginated body as-is.
    pub async fn list_students(&self, filters: &StudentFilters) -> Result<Value, ApiError> {
        self.get("/admin/students", &filters.to_query()).await
    }

    /// `GET /admin/students/stats`.
    pub async fn student_stats(&self) -> Result<Value, ApiError> {
        let body = self.get("/admin/students/stats", &[]).await?;
        Ok(unwrap_envelope(body, "stats"))
    }

    /// `GET /admin/students/{id}`.
    pub async fn student_detail(&self, id: &str) -> Result<Value, ApiError> {
        let body = self.get(&format!("/admin/students/{id}"), &[]).await?;
        Ok(unwrap_envelope(body, "student"))
    }

    /// `PUT /admin/students/{id}/status`.
    pub async fn update_student_status(
        &self,
        id: &str,
        update: &StudentStatusUpdate,
    ) -> Result<Value, ApiError> {
        self.put(&format!("/admin/students/{id}/status"), Some(update))
            .await
    }
}
