//! Session store: the single source of truth for "who is signed in".
//!
//! ARCHITECTURE
//! ============
//! One optional `SessionEnvelope` lives in a `watch` channel so readers can
//! take a synchronous snapshot or await change notifications. The same
//! envelope is mirrored as one JSON record under one storage key.
//!
//! INVARIANTS
//! ==========
//! - Writes go storage first, snapshot second, under one mutex. The snapshot
//!   never shows a session that is not durable, and a failed durable write
//!   leaves the snapshot untouched.
//! - Only envelopes passing `SessionEnvelope::is_valid` are ever published.
//! - Restoring never fails: unreadable, unparseable or invalid records all
//!   resolve to "no session", and corrupt records are removed.

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;

use crate::models::SessionEnvelope;
use crate::storage::{SessionStorage, StorageError};

/// Storage key holding the serialized envelope.
pub const SESSION_STORAGE_KEY: &str = "auth_session";

const DEFAULT_TOKEN_TYPE: &str = "Bearer";

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The envelope lacks a token or an email.
    #[error("session envelope is missing a token or email")]
    InvalidEnvelope,

    #[error("session encode failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Cloneable handle to the process-wide session.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

struct Inner {
    storage: Arc<dyn SessionStorage>,
    key: String,
    /// Serializes (durable record, snapshot) updates.
    write_lock: Mutex<()>,
    current: watch::Sender<Option<SessionEnvelope>>,
}

impl SessionStore {
    /// Build a store over `storage` using [`SESSION_STORAGE_KEY`] and restore
    /// any persisted session.
    #[must_use]
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self::with_key(storage, SESSION_STORAGE_KEY)
    }

    /// Same as [`SessionStore::new`] with a custom storage key.
    #[must_use]
    pub fn with_key(storage: Arc<dyn SessionStorage>, key: impl Into<String>) -> Self {
        let (current, _) = watch::channel(None);
        let store = Self {
            inner: Arc::new(Inner { storage, key: key.into(), write_lock: Mutex::new(()), current }),
        };
        store.restore();
        store
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.inner.key
    }

    /// Reload the snapshot from durable storage.
    pub fn restore(&self) {
        let _guard = self.lock();
        let restored = self.load();
        self.inner.current.send_replace(restored);
    }

    fn load(&self) -> Option<SessionEnvelope> {
        let key = self.key();
        let raw = match self.inner.storage.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key, error = %e, "session storage unreadable; starting signed out");
                return None;
            }
        };

        match serde_json::from_str::<SessionEnvelope>(&raw) {
            Ok(envelope) if envelope.is_valid() => {
                tracing::debug!(user_id = envelope.user_id, "session restored");
                Some(envelope)
            }
            Ok(_) => {
                tracing::warn!(key, "stored session lacks token or email; discarding");
                self.discard_corrupt();
                None
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "stored session is unreadable; discarding");
                self.discard_corrupt();
                None
            }
        }
    }

    fn discard_corrupt(&self) {
        if let Err(e) = self.inner.storage.remove(self.key()) {
            tracing::warn!(key = self.key(), error = %e, "failed to remove corrupt session record");
        }
    }

    /// Persist `envelope` as the active session, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidEnvelope`] for envelopes without a token
    /// or email, or a storage/encoding error. On error nothing changes.
    pub fn commit(&self, envelope: SessionEnvelope) -> Result<(), SessionError> {
        if !envelope.is_valid() {
            return Err(SessionError::InvalidEnvelope);
        }
        let raw = serde_json::to_string(&envelope)?;

        let _guard = self.lock();
        self.inner.storage.set(self.key(), &raw)?;
        tracing::info!(user_id = envelope.user_id, "session committed");
        self.inner.current.send_replace(Some(envelope));
        Ok(())
    }

    /// Drop the active session. Clearing an empty store is a no-op.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the record could not be removed; the
    /// snapshot is left as it was.
    pub fn clear(&self) -> Result<(), SessionError> {
        let _guard = self.lock();
        self.inner.storage.remove(self.key())?;
        let previous = self.inner.current.send_replace(None);
        if let Some(previous) = previous {
            tracing::info!(user_id = previous.user_id, "session cleared");
        }
        Ok(())
    }

    /// Latest committed session, if any.
    #[must_use]
    pub fn snapshot(&self) -> Option<SessionEnvelope> {
        self.inner.current.borrow().clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.current.borrow().is_some()
    }

    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.inner.current.borrow().as_ref().map(|s| s.token.clone())
    }

    #[must_use]
    pub fn roles(&self) -> Vec<String> {
        self.inner
            .current
            .borrow()
            .as_ref()
            .map(|s| s.roles.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.inner
            .current
            .borrow()
            .as_ref()
            .is_some_and(|s| s.roles.iter().any(|r| r == role))
    }

    /// `Authorization` header value for the active session, e.g. `Bearer abc`.
    #[must_use]
    pub fn authorization_header(&self) -> Option<String> {
        let current = self.inner.current.borrow();
        let session = current.as_ref()?;
        let scheme = if session.token_type.is_empty() { DEFAULT_TOKEN_TYPE } else { &session.token_type };
        Some(format!("{scheme} {}", session.token))
    }

    /// Receiver notified after every commit, clear and restore.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<SessionEnvelope>> {
        self.inner.current.subscribe()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        self.inner.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("key", &self.inner.key)
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}
