//! Pluggable session storage.
//!
//! The [`SessionStore`] trait abstracts over where the stable device id and
//! the mutable auth token live.  Two built-in stores are provided:
//! * [`JsonFileStore`] — a small JSON file on disk (default).
//! * [`MemoryStore`] — ephemeral, for tests and always-fresh runs.

use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Trait ────────────────────────────────────────────────────────────────────

/// An abstraction over session persistence.
pub trait SessionStore: Send + Sync {
    /// The stable device identifier; created on first access.
    fn device_id(&self) -> io::Result<Uuid>;

    /// The persisted auth token, or `None` when the device never logged in.
    fn token(&self) -> io::Result<Option<String>>;

    /// Persist a freshly issued auth token.
    fn set_token(&self, token: &str) -> io::Result<()>;

    /// Forget the auth token (e.g. after the server invalidated it).
    fn clear_token(&self) -> io::Result<()>;

    /// Human-readable name of this store (for log messages).
    fn name(&self) -> &str;
}

// ─── JsonFileStore ────────────────────────────────────────────────────────────

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSession {
    device_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    token:     Option<String>,
}

/// The default store — keeps `{deviceId, token}` in a JSON file.
pub struct JsonFileStore {
    path:  PathBuf,
    cache: Mutex<Option<StoredSession>>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), cache: Mutex::new(None) }
    }

    /// Load from disk (or mint a fresh device id) into the cache slot.
    fn loaded(&self, cache: &mut Option<StoredSession>) -> io::Result<StoredSession> {
        if let Some(s) = cache.as_ref() {
            return Ok(s.clone());
        }
        let session = if self.path.exists() {
            let text = std::fs::read_to_string(&self.path)?;
            serde_json::from_str(&text).map_err(io::Error::other)?
        } else {
            let fresh = StoredSession { device_id: Uuid::new_v4(), token: None };
            self.write(&fresh)?;
            fresh
        };
        *cache = Some(session.clone());
        Ok(session)
    }

    fn write(&self, session: &StoredSession) -> io::Result<()> {
        let text = serde_json::to_string_pretty(session).map_err(io::Error::other)?;
        std::fs::write(&self.path, text)
    }
}

impl SessionStore for JsonFileStore {
    fn device_id(&self) -> io::Result<Uuid> {
        let mut cache = self.cache.lock().unwrap();
        Ok(self.loaded(&mut cache)?.device_id)
    }

    fn token(&self) -> io::Result<Option<String>> {
        let mut cache = self.cache.lock().unwrap();
        Ok(self.loaded(&mut cache)?.token)
    }

    fn set_token(&self, token: &str) -> io::Result<()> {
        let mut cache = self.cache.lock().unwrap();
        let mut session = self.loaded(&mut cache)?;
        session.token = Some(token.to_string());
        self.write(&session)?;
        *cache = Some(session);
        Ok(())
    }

    fn clear_token(&self) -> io::Result<()> {
        let mut cache = self.cache.lock().unwrap();
        let mut session = self.loaded(&mut cache)?;
        session.token = None;
        self.write(&session)?;
        *cache = Some(session);
        Ok(())
    }

    fn name(&self) -> &str { "json-file" }
}

// ─── MemoryStore ──────────────────────────────────────────────────────────────

/// An ephemeral store that persists nothing.
pub struct MemoryStore {
    device_id: Uuid,
    token:     Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self { device_id: Uuid::new_v4(), token: Mutex::new(None) }
    }

    /// A store pre-seeded with a token, so `start` skips the auth sub-flow.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            device_id: Uuid::new_v4(),
            token:     Mutex::new(Some(token.into())),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self { Self::new() }
}

impl SessionStore for MemoryStore {
    fn device_id(&self) -> io::Result<Uuid> {
        Ok(self.device_id)
    }

    fn token(&self) -> io::Result<Option<String>> {
        Ok(self.token.lock().unwrap().clone())
    }

    fn set_token(&self, token: &str) -> io::Result<()> {
        *self.token.lock().unwrap() = Some(token.to_string());
        Ok(())
    }

    fn clear_token(&self) -> io::Result<()> {
        *self.token.lock().unwrap() = None;
        Ok(())
    }

    fn name(&self) -> &str { "in-memory" }
}
