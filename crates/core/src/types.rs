/// Server-assigned identifiers are opaque strings (Mongo-style `_id`).
pub type EntityId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
