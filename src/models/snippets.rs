use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use time::{Duration, OffsetDateTime};

use crate::models::ModelError;

pub type SnippetId = i64;

/// How many snippets the home page lists.
pub const LATEST_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snippet {
    pub id: SnippetId,
    pub title: String,
    pub content: String,
    pub created: OffsetDateTime,
    pub expires: OffsetDateTime,
}

impl Snippet {
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires <= now
    }
}

#[async_trait]
pub trait SnippetStore: Send + Sync {
    /// Store a snippet living `expires_days` days and return its ID.
    async fn insert(&self, title: &str, content: &str, expires_days: i64) -> Result<SnippetId, ModelError>;

    /// Fetch a live snippet. Expired snippets are [`ModelError::NoRecord`].
    async fn get(&self, id: SnippetId) -> Result<Snippet, ModelError>;

    /// Most recently created live snippets, newest first.
    async fn latest(&self) -> Result<Vec<Snippet>, ModelError>;
}

/// Process-local snippet table.
#[derive(Debug, Clone, Default)]
pub struct MemorySnippetStore {
    rows: Arc<DashMap<SnippetId, Snippet>>,
    next_id: Arc<AtomicI64>,
}

impl MemorySnippetStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnippetStore for MemorySnippetStore {
    async fn insert(&self, title: &str, content: &str, expires_days: i64) -> Result<SnippetId, ModelError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let created = OffsetDateTime::now_utc();
        self.rows.insert(
            id,
            Snippet {
                id,
                title: title.to_string(),
                content: content.to_string(),
                created,
                expires: created + Duration::days(expires_days),
            },
        );
        Ok(id)
    }

    async fn get(&self, id: SnippetId) -> Result<Snippet, ModelError> {
        let now = OffsetDateTime::now_utc();
        self.rows
            .get(&id)
            .map(|row| row.value().clone())
            .filter(|snippet| !snippet.is_expired(now))
            .ok_or(ModelError::NoRecord)
    }

    async fn latest(&self) -> Result<Vec<Snippet>, ModelError> {
        let now = OffsetDateTime::now_utc();
        let mut live: Vec<Snippet> = self
            .rows
            .iter()
            .filter(|row| !row.is_expired(now))
            .map(|row| row.value().clone())
            .collect();
        live.sort_by(|a, b| b.id.cmp(&a.id));
        live.truncate(LATEST_LIMIT);
        Ok(live)
    }
}
