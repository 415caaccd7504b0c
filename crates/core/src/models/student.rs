use serde::{Deserialize, Serialize};

use crate::types::{EntityId, Timestamp};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    #[serde(rename = "_id")]
    pub id: EntityId,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub approved: bool,
    #[serde(default)]
    pub profile_completion: Option<u8>,
    pub created_at: Timestamp,
}

/// Status filter accepted by the students list endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StudentStatusFilter {
    #[default]
    All,
    Active,
    Inactive,
}

impl StudentStatusFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            StudentStatusFilter::All => "all",
            StudentStatusFilter::Active => "active",
            StudentStatusFilter::Inactive => "inactive",
        }
    }
}

/// Body for the student status mutation. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StudentStatusUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved: Option<bool>,
}
