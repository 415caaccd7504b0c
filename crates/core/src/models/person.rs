use serde::{Deserialize, Serialize};

use crate::types::EntityId;

/// Compact profile embedded in conversations, messages and appointments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonSummary {
    #[serde(rename = "_id")]
    pub id: EntityId,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub image: Option<String>,
}

impl PersonSummary {
    /// `"First Last"`, trimmed when either part is missing.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// A reference to another entity that the backend may or may not have
/// populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityRef {
    Populated(PersonSummary),
    Id(EntityId),
}

impl EntityRef {
    pub fn id(&self) -> &str {
        match self {
            EntityRef::Populated(person) => &person.id,
            EntityRef::Id(id) => id,
        }
    }
}
