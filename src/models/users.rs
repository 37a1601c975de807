use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use anyhow::Context as _;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use time::OffsetDateTime;

use crate::models::ModelError;

pub type UserId = i64;

#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub hashed_password: String,
    pub created: OffsetDateTime,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create an account. The email must not be registered yet.
    async fn insert(&self, name: &str, email: &str, password: &str) -> Result<(), ModelError>;

    /// Check an email/password pair and return the matching user's ID.
    async fn authenticate(&self, email: &str, password: &str) -> Result<UserId, ModelError>;

    async fn exists(&self, id: UserId) -> Result<bool, ModelError>;

    async fn get(&self, id: UserId) -> Result<User, ModelError>;

    /// Replace the password after checking the current one.
    async fn password_update(&self, id: UserId, current: &str, new: &str) -> Result<(), ModelError>;
}

/// Hash with Argon2id into a PHC string. CPU-heavy; run off the reactor.
fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("failed to hash password: {}", e))?;
    Ok(hash.to_string())
}

fn verify_password(hash: &str, password: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| anyhow::anyhow!("invalid password hash: {}", e))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

async fn hash_blocking(password: &str) -> Result<String, ModelError> {
    let password = password.to_string();
    let hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .context("password hashing task failed")??;
    Ok(hash)
}

async fn verify_blocking(hash: String, password: &str) -> Result<bool, ModelError> {
    let password = password.to_string();
    let ok = tokio::task::spawn_blocking(move || verify_password(&hash, &password))
        .await
        .context("password verification task failed")??;
    Ok(ok)
}

fn email_key(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Process-local user table with a unique email index.
#[derive(Debug, Clone, Default)]
pub struct MemoryUserStore {
    rows: Arc<DashMap<UserId, User>>,
    by_email: Arc<DashMap<String, UserId>>,
    next_id: Arc<AtomicI64>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn current_hash(&self, id: UserId) -> Result<String, ModelError> {
        self.rows
            .get(&id)
            .map(|row| row.hashed_password.clone())
            .ok_or(ModelError::NoRecord)
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(&self, name: &str, email: &str, password: &str) -> Result<(), ModelError> {
        let key = email_key(email);
        if self.by_email.contains_key(&key) {
            return Err(ModelError::DuplicateEmail);
        }
        let hashed_password = hash_blocking(password).await?;

        // The index entry is the uniqueness constraint; a concurrent signup
        // may have won the race while we were hashing.
        match self.by_email.entry(key) {
            Entry::Occupied(_) => Err(ModelError::DuplicateEmail),
            Entry::Vacant(slot) => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
                self.rows.insert(
                    id,
                    User {
                        id,
                        name: name.to_string(),
                        email: email.to_string(),
                        hashed_password,
                        created: OffsetDateTime::now_utc(),
                    },
                );
                slot.insert(id);
                Ok(())
            }
        }
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<UserId, ModelError> {
        let id = self
            .by_email
            .get(&email_key(email))
            .map(|entry| *entry.value())
            .ok_or(ModelError::InvalidCredentials)?;
        let hash = self.current_hash(id).map_err(|_| ModelError::InvalidCredentials)?;

        if verify_blocking(hash, password).await? {
            Ok(id)
        } else {
            Err(ModelError::InvalidCredentials)
        }
    }

    async fn exists(&self, id: UserId) -> Result<bool, ModelError> {
        Ok(self.rows.contains_key(&id))
    }

    async fn get(&self, id: UserId) -> Result<User, ModelError> {
        self.rows
            .get(&id)
            .map(|row| row.value().clone())
            .ok_or(ModelError::NoRecord)
    }

    async fn password_update(&self, id: UserId, current: &str, new: &str) -> Result<(), ModelError> {
        let hash = self.current_hash(id)?;
        if !verify_blocking(hash, current).await? {
            return Err(ModelError::InvalidCredentials);
        }

        let replacement = hash_blocking(new).await?;
        match self.rows.get_mut(&id) {
            Some(mut row) => {
                row.hashed_password = replacement;
                Ok(())
            }
            None => Err(ModelError::NoRecord),
        }
    }
}
