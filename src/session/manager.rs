//! Session lifecycle: load on request, save on response.
//!
//! # Responsibilities
//! - Resolve the session cookie to a stored record (or start a new one)
//! - Persist mutations and retire rotated tokens
//! - Write, refresh, or expire the session cookie
//!
//! Loading fails open: a store outage yields an empty anonymous session.
//! Saving fails closed: the caller must turn the error into a 500, since a
//! lost write may be a lost login.

use std::sync::Arc;

use axum::http::header::{COOKIE, SET_COOKIE, VARY};
use axum::http::{HeaderMap, HeaderValue};
use axum::response::Response;
use cookie::{Cookie, SameSite};
use time::OffsetDateTime;

use crate::config::schema::MAX_SESSION_LIFETIME;
use crate::config::SessionConfig;
use crate::session::state::{Session, SessionStatus};
use crate::session::store::{SessionRecord, SessionStore, SessionStoreError};

/// Owns the session store and the cookie policy.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    config: SessionConfig,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, config: SessionConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Expiry for a session starting now; the lifetime is clamped so the
    /// addition cannot overflow.
    fn new_expiry(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc() + self.config.lifetime.min(MAX_SESSION_LIFETIME)
    }

    /// Resolve the incoming session cookie.
    ///
    /// Absent, unknown, expired, or unreadable sessions all produce a fresh
    /// empty session with a newly generated token.
    pub async fn load(&self, headers: &HeaderMap) -> Session {
        let Some(token) = self.token_from(headers) else {
            return Session::fresh(self.new_expiry());
        };

        match self.store.find(&token).await {
            Ok(Some(record)) if !record.is_expired() => {
                let session = Session::from_parts(token, record.data, record.expiry);
                if self.config.sliding_expiry {
                    session.touch(self.new_expiry());
                }
                session
            }
            Ok(_) => Session::fresh(self.new_expiry()),
            Err(e) => {
                tracing::warn!(error = %e, "session store unavailable, continuing anonymously");
                Session::fresh(self.new_expiry())
            }
        }
    }

    fn token_from(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(Cookie::split_parse)
            .filter_map(Result::ok)
            .find(|c| c.name() == self.config.cookie_name)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Persist the session and write the cookie, if anything changed.
    pub async fn save(&self, session: &Session, response: &mut Response) -> Result<(), SessionStoreError> {
        let snapshot = session.snapshot();

        match snapshot.status {
            SessionStatus::Unmodified => return Ok(()),
            SessionStatus::Modified => {
                for old in &snapshot.retired {
                    self.store.delete(old).await?;
                }
                let record = SessionRecord {
                    data: snapshot.data,
                    expiry: snapshot.expiry,
                };
                self.store.commit(&snapshot.token, record).await?;
                self.write_cookie(response, &snapshot.token, Some(snapshot.expiry))?;
            }
            SessionStatus::Destroyed => {
                for old in snapshot.retired.iter().chain(std::iter::once(&snapshot.token)) {
                    self.store.delete(old).await?;
                }
                self.write_cookie(response, "", None)?;
            }
        }

        session.mark_saved();
        Ok(())
    }

    /// `expiry: None` expires the cookie immediately.
    fn write_cookie(
        &self,
        response: &mut Response,
        token: &str,
        expiry: Option<OffsetDateTime>,
    ) -> Result<(), SessionStoreError> {
        let mut cookie = Cookie::build((self.config.cookie_name.clone(), token.to_string()))
            .path("/")
            .http_only(true)
            .secure(self.config.cookie_secure)
            .same_site(SameSite::Lax)
            .build();

        match expiry {
            Some(expiry) => {
                let remaining = expiry - OffsetDateTime::now_utc();
                cookie.set_max_age(remaining.max(time::Duration::ZERO));
                cookie.set_expires(expiry);
            }
            None => {
                cookie.set_max_age(time::Duration::ZERO);
                cookie.set_expires(OffsetDateTime::UNIX_EPOCH);
            }
        }

        let headers = response.headers_mut();
        headers.append(SET_COOKIE, HeaderValue::from_str(&cookie.to_string())?);
        headers.append(VARY, HeaderValue::from_static("Cookie"));
        Ok(())
    }
}
