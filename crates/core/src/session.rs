//! Persisted admin session (bearer token + profile).
//!
//! The session is read when the event channel connects and on every REST
//! call, and cleared on logout or when the backend answers 401.

use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::EntityId;

/// The logged-in administrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminProfile {
    #[serde(rename = "_id")]
    pub id: EntityId,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: Option<String>,
}

/// Bearer credential plus the serialized user profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: AdminProfile,
}

/// Storage backend for the persisted session.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Option<Session>, CoreError>;

    fn save(&self, session: &Session) -> Result<(), CoreError>;

    fn clear(&self) -> Result<(), CoreError>;

    /// The bearer token, if a session is present and readable.
    fn token(&self) -> Option<String> {
        match self.load() {
            Ok(session) => session.map(|s| s.token),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read persisted session");
                None
            }
        }
    }
}

/// Session persisted as a JSON file on disk.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<Session>, CoreError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CoreError::Session(e.to_string())),
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| CoreError::Session(format!("corrupt session file: {e}")))
    }

    fn save(&self, session: &Session) -> Result<(), CoreError> {
        let raw =
            serde_json::to_string_pretty(session).map_err(|e| CoreError::Session(e.to_string()))?;
        std::fs::write(&self.path, raw).map_err(|e| CoreError::Session(e.to_string()))
    }

    fn clear(&self) -> Result<(), CoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CoreError::Session(e.to_string())),
        }
    }
}

/// In-process session, used by tests and embedders that manage
/// persistence themselves.
#[derive(Default)]
pub struct MemorySessionStore {
    session: Mutex<Option<Session>>,
}

impl MemorySessionStore {
    pub fn with_session(session: Session) -> Self {
        Self {
            session: Mutex::new(Some(session)),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<Session>, CoreError> {
        let guard = self
            .session
            .lock()
            .map_err(|_| CoreError::Session("session lock poisoned".into()))?;
        Ok(guard.clone())
    }

    fn save(&self, session: &Session) -> Result<(), CoreError> {
        let mut guard = self
            .session
            .lock()
            .map_err(|_| CoreError::Session("session lock poisoned".into()))?;
        *guard = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), CoreError> {
        let mut guard = self
            .session
            .lock()
            .map_err(|_| CoreError::Session("session lock poisoned".into()))?;
        *guard = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn sample() -> Session {
        Session {
            token: "tok-123".into(),
            user: AdminProfile {
                id: "admin-1".into(),
                first_name: "Grace".into(),
                last_name: "Ade".into(),
                email: "grace@fly8.global".into(),
                role: Some("admin".into()),
            },
        }
    }

    #[test]
    fn file_store_round_trips_and_clears() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("session.json"));

        assert_eq!(store.load().unwrap(), None);
        store.save(&sample()).unwrap();
        assert_eq!(store.token().as_deref(), Some("tok-123"));

        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
        // Clearing twice is fine.
        store.clear().unwrap();
    }

    #[test]
    fn corrupt_file_is_a_session_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = FileSessionStore::new(path);
        assert_matches!(store.load(), Err(CoreError::Session(_)));
        assert_eq!(store.token(), None);
    }

    #[test]
    fn memory_store_clear_drops_token() {
        let store = MemorySessionStore::with_session(sample());
        assert_eq!(store.token().as_deref(), Some("tok-123"));
        store.clear().unwrap();
        assert_eq!(store.token(), None);
    }
}
