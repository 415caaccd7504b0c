//! `/admin/appointments` endpoints used by the dashboard.

use serde_json::Value;

use crate::client::{unwrap_envelope, ApiClient};
use crate::error::ApiError;

impl ApiClient {
    /// `GET /admin/appointments/stats`.
    pub async fn appointment_stats(&self) -> Result<Value, ApiError> {
        let body = self.get("/admin/appointments/stats", &[]).await?;
        Ok(unwrap_envelope(body, "stats"))
    }

    /// `GET /admin/appointments/today`. Returns the appointment array.
    pub async fn today_appointments(&self) -> Result<Value, ApiError> {
        let body = self.get("/admin/appointments/today", &[]).await?;
        Ok(unwrap_envelope(body, "appointments"))
    }
}
