//! Typed accessor over a client's storage: token, serialized user, login flag and role string.
//! All writes go through one writer lock and publish a `SessionEvent` to subscribers.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use super::principal::{Principal, User};
use super::storage::{MemoryStorage, Storage, StorageError};

const EVENT_CAPACITY: usize = 16;

/// Storage key names. Configurable so several portals can share one storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionKeys {
    pub token: String,
    pub user: String,
    pub logged_in: String,
    pub role: String,
}

impl Default for SessionKeys {
    fn default() -> Self {
        Self {
            token: "token".to_string(),
            user: "user".to_string(),
            logged_in: "isLoggedIn".to_string(),
            role: "role".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    SignedIn { role: String, at: DateTime<Utc> },
    SignedOut { at: DateTime<Utc> },
}

pub struct SessionStore {
    storage: Arc<dyn Storage>,
    keys: SessionKeys,
    writer: Mutex<()>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn Storage>, keys: SessionKeys) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { storage, keys, writer: Mutex::new(()), events }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()), SessionKeys::default())
    }

    pub fn keys(&self) -> &SessionKeys { &self.keys }

    /// The stored user, or `None` when nothing is stored or the value does not parse.
    pub fn get_stored_user(&self) -> Option<User> {
        let raw = self.storage.get_item(&self.keys.user)?;
        match serde_json::from_str::<User>(&raw) {
            Ok(u) => Some(u),
            Err(e) => {
                debug!(target: "bizdesk::session", "stored user does not parse, treating as logged out: {}", e);
                None
            }
        }
    }

    pub fn token(&self) -> Option<String> {
        self.storage.get_item(&self.keys.token).filter(|t| !t.is_empty())
    }

    pub fn role(&self) -> Option<String> {
        self.storage.get_item(&self.keys.role).filter(|r| !r.is_empty())
    }

    pub fn is_logged_in(&self) -> bool {
        self.storage.get_item(&self.keys.logged_in).as_deref() == Some("true")
    }

    /// Authenticated only when both a token and a parseable user are present.
    pub fn principal(&self) -> Principal {
        if self.token().is_none() { return Principal::Anonymous; }
        Principal::from(self.get_stored_user())
    }

    pub fn set_stored_auth(&self, token: &str, user: &User, role: &str) -> Result<(), StorageError> {
        let encoded = serde_json::to_string(user)?;
        {
            let _w = self.writer.lock();
            self.storage.set_item(&self.keys.token, token)?;
            self.storage.set_item(&self.keys.user, &encoded)?;
            self.storage.set_item(&self.keys.logged_in, "true")?;
            self.storage.set_item(&self.keys.role, role)?;
        }
        debug!(target: "bizdesk::session", "session stored user={} role={}", user.display_name(), role);
        let _ = self.events.send(SessionEvent::SignedIn { role: role.to_string(), at: Utc::now() });
        Ok(())
    }

    pub fn clear_stored_auth(&self) -> Result<(), StorageError> {
        {
            let _w = self.writer.lock();
            self.storage.remove_item(&self.keys.token)?;
            self.storage.remove_item(&self.keys.user)?;
            self.storage.remove_item(&self.keys.logged_in)?;
            self.storage.remove_item(&self.keys.role)?;
        }
        debug!(target: "bizdesk::session", "session cleared");
        let _ = self.events.send(SessionEvent::SignedOut { at: Utc::now() });
        Ok(())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore").field("keys", &self.keys).finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod session_tests;
