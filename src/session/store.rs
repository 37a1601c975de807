//! Session persistence backends.
//!
//! # Responsibilities
//! - Persist opaque session records keyed by token
//! - Hide expired records from lookups
//! - Sweep expired records on demand
//!
//! Same-token concurrent writes are last-write-wins.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use time::OffsetDateTime;

/// Key/value payload carried by a session.
pub type SessionData = HashMap<String, serde_json::Value>;

/// A persisted session, as seen by a store.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub data: SessionData,
    pub expiry: OffsetDateTime,
}

impl SessionRecord {
    /// Whether the record is past its expiry.
    pub fn is_expired(&self) -> bool {
        self.expiry <= OffsetDateTime::now_utc()
    }
}

/// Errors raised by session persistence.
#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    /// The backend could not serve the request.
    #[error("session backend failure: {0:#}")]
    Backend(#[from] anyhow::Error),

    /// A session value could not be encoded.
    #[error("failed to encode session value: {0}")]
    Encode(#[from] serde_json::Error),

    /// The session cookie could not be rendered as a header.
    #[error("invalid session cookie header: {0}")]
    Cookie(#[from] axum::http::header::InvalidHeaderValue),
}

/// Pluggable persistence for session records.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Look up a live record. Expired or unknown tokens yield `None`.
    async fn find(&self, token: &str) -> Result<Option<SessionRecord>, SessionStoreError>;

    /// Insert or overwrite the record stored under `token`.
    async fn commit(&self, token: &str, record: SessionRecord) -> Result<(), SessionStoreError>;

    /// Remove the record stored under `token`. Unknown tokens are not an error.
    async fn delete(&self, token: &str) -> Result<(), SessionStoreError>;

    /// Remove every expired record, returning how many were dropped.
    async fn delete_expired(&self) -> Result<usize, SessionStoreError>;
}

/// In-process session store.
///
/// Records live in a sharded concurrent map, so requests on unrelated
/// tokens never wait on each other. Nothing survives a restart.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<DashMap<String, SessionRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held, expired or not.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("records", &self.inner.len())
            .finish()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn find(&self, token: &str) -> Result<Option<SessionRecord>, SessionStoreError> {
        // Clone out before touching the map again: holding a shard guard
        // across `remove_if` would deadlock.
        let record = self.inner.get(token).map(|r| r.value().clone());
        match record {
            Some(record) if record.is_expired() => {
                self.inner.remove_if(token, |_, r| r.is_expired());
                Ok(None)
            }
            other => Ok(other),
        }
    }

    async fn commit(&self, token: &str, record: SessionRecord) -> Result<(), SessionStoreError> {
        self.inner.insert(token.to_string(), record);
        Ok(())
    }

    async fn delete(&self, token: &str) -> Result<(), SessionStoreError> {
        self.inner.remove(token);
        Ok(())
    }

    async fn delete_expired(&self) -> Result<usize, SessionStoreError> {
        let now = OffsetDateTime::now_utc();
        let mut removed = 0;
        self.inner.retain(|_, record| {
            let keep = record.expiry > now;
            if !keep {
                removed += 1;
            }
            keep
        });
        Ok(removed)
    }
}
