//! Request-scoped session handle.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::de::DeserializeOwned;
use serde::Serialize;
use time::OffsetDateTime;

use crate::session::store::SessionData;
use crate::session::token;

/// What `save` has to do with a session at the end of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Nothing changed; no write, no cookie.
    Unmodified,
    /// Data, expiry, or token changed; persist and refresh the cookie.
    Modified,
    /// Delete the record and expire the cookie.
    Destroyed,
}

#[derive(Debug)]
struct Inner {
    token: String,
    data: SessionData,
    expiry: OffsetDateTime,
    status: SessionStatus,
    /// Tokens this session has rotated away from, pending deletion.
    retired: Vec<String>,
}

/// Handle on the session attached to the current request.
///
/// Cloning is cheap and every clone sees the same state. The session
/// manager keeps one clone so it can persist whatever the downstream
/// stages did.
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<Mutex<Inner>>,
}

/// Point-in-time copy of a session, used when persisting.
#[derive(Debug, Clone)]
pub(crate) struct Snapshot {
    pub token: String,
    pub data: SessionData,
    pub expiry: OffsetDateTime,
    pub status: SessionStatus,
    pub retired: Vec<String>,
}

impl Session {
    /// A brand new, empty session with a freshly generated token.
    pub(crate) fn fresh(expiry: OffsetDateTime) -> Self {
        Self::from_parts(token::generate(), SessionData::new(), expiry)
    }

    /// A session rehydrated from the store.
    pub(crate) fn from_parts(token: String, data: SessionData, expiry: OffsetDateTime) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                token,
                data,
                expiry,
                status: SessionStatus::Unmodified,
                retired: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panicking handler must not wedge the session for the save step.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The current session token.
    pub fn token(&self) -> String {
        self.lock().token.clone()
    }

    pub fn expiry(&self) -> OffsetDateTime {
        self.lock().expiry
    }

    pub fn status(&self) -> SessionStatus {
        self.lock().status
    }

    /// Typed read. A value stored under a different shape reads as absent.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let inner = self.lock();
        let value = inner.data.get(key)?.clone();
        drop(inner);
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(err) => {
                tracing::debug!(key, error = %err, "session value has unexpected type");
                None
            }
        }
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().data.contains_key(key)
    }

    /// Store `value` under `key`.
    pub fn insert<T: Serialize>(&self, key: impl Into<String>, value: T) -> Result<(), serde_json::Error> {
        let value = serde_json::to_value(value)?;
        let mut inner = self.lock();
        inner.data.insert(key.into(), value);
        inner.mark_modified();
        Ok(())
    }

    /// Remove `key`, returning whether it was present.
    pub fn remove(&self, key: &str) -> bool {
        let mut inner = self.lock();
        let removed = inner.data.remove(key).is_some();
        if removed {
            inner.mark_modified();
        }
        removed
    }

    /// One-time read: return the value and delete it in the same step.
    pub fn pop<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = {
            let mut inner = self.lock();
            let value = inner.data.remove(key)?;
            inner.mark_modified();
            value
        };
        serde_json::from_value(value).ok()
    }

    pub fn pop_string(&self, key: &str) -> Option<String> {
        self.pop(key)
    }

    /// Issue a new token and retire the old one.
    ///
    /// The data carries over; the old token stops resolving once the
    /// session is saved.
    pub fn rotate_token(&self) {
        let mut inner = self.lock();
        let old = std::mem::replace(&mut inner.token, token::generate());
        inner.retired.push(old);
        inner.mark_modified();
    }

    /// Drop all data and delete the record on save.
    pub fn destroy(&self) {
        let mut inner = self.lock();
        inner.data.clear();
        inner.status = SessionStatus::Destroyed;
    }

    /// Push the expiry forward (sliding sessions).
    pub(crate) fn touch(&self, expiry: OffsetDateTime) {
        let mut inner = self.lock();
        inner.expiry = expiry;
        inner.mark_modified();
    }

    pub(crate) fn snapshot(&self) -> Snapshot {
        let inner = self.lock();
        Snapshot {
            token: inner.token.clone(),
            data: inner.data.clone(),
            expiry: inner.expiry,
            status: inner.status,
            retired: inner.retired.clone(),
        }
    }

    /// Reset bookkeeping after a successful save.
    pub(crate) fn mark_saved(&self) {
        let mut inner = self.lock();
        inner.retired.clear();
        if inner.status == SessionStatus::Modified {
            inner.status = SessionStatus::Unmodified;
        }
    }
}

impl Inner {
    fn mark_modified(&mut self) {
        if self.status != SessionStatus::Destroyed {
            self.status = SessionStatus::Modified;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn session() -> Session {
        Session::fresh(OffsetDateTime::now_utc() + Duration::hours(1))
    }

    #[test]
    fn fresh_sessions_start_clean() {
        let s = session();
        assert_eq!(s.status(), SessionStatus::Unmodified);
        assert!(!s.contains("flash"));
    }

    #[test]
    fn pop_reads_once() {
        let s = session();
        s.insert("flash", "Saved!").unwrap();

        assert_eq!(s.pop_string("flash").as_deref(), Some("Saved!"));
        assert_eq!(s.pop_string("flash"), None);
        assert_eq!(s.status(), SessionStatus::Modified);
    }

    #[test]
    fn pop_of_missing_key_does_not_modify() {
        let s = session();
        assert_eq!(s.pop_string("flash"), None);
        assert_eq!(s.status(), SessionStatus::Unmodified);
    }

    #[test]
    fn typed_reads() {
        let s = session();
        s.insert("authenticatedUserID", 42_i64).unwrap();

        assert_eq!(s.get::<i64>("authenticatedUserID"), Some(42));
        assert_eq!(s.get_string("authenticatedUserID"), None);
    }

    #[test]
    fn rotation_keeps_data_and_retires_old_token() {
        let s = session();
        s.insert("k", "v").unwrap();
        let before = s.token();

        s.rotate_token();

        let snap = s.snapshot();
        assert_ne!(snap.token, before);
        assert_eq!(snap.retired, vec![before]);
        assert_eq!(s.get_string("k").as_deref(), Some("v"));

        s.mark_saved();
        assert!(s.snapshot().retired.is_empty());
        assert_eq!(s.status(), SessionStatus::Unmodified);
    }

    #[test]
    fn destroyed_stays_destroyed() {
        let s = session();
        s.insert("k", "v").unwrap();
        s.destroy();
        s.insert("k", "again").unwrap();
        assert_eq!(s.status(), SessionStatus::Destroyed);
    }

    #[test]
    fn clones_share_state() {
        let s = session();
        let other = s.clone();
        other.insert("k", 1).unwrap();
        assert_eq!(s.get::<i32>("k"), Some(1));
    }
}
