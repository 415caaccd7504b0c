use serde::{Deserialize, Serialize};

use crate::models::person::EntityRef;
use crate::types::{EntityId, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
    NoShow,
}

/// A counselling appointment between a student and an advisor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    #[serde(rename = "_id")]
    pub id: EntityId,
    pub student: EntityRef,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub start_time: Option<String>,
    pub status: AppointmentStatus,
    pub created_at: Timestamp,
}

impl Appointment {
    /// Appointments that still need an advisor's attention today.
    pub fn is_open(&self) -> bool {
        matches!(
            self.status,
            AppointmentStatus::Pending | AppointmentStatus::Confirmed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_show_status_uses_kebab_case() {
        let status: AppointmentStatus = serde_json::from_str(r#""no-show""#).unwrap();
        assert_eq!(status, AppointmentStatus::NoShow);
    }
}
