//! Authentication gate.
//!
//! # Data Flow
//! ```text
//! Session (authenticatedUserID?)
//!     → Authenticate: project into AuthState on the request context
//!     → RequireAuthentication: Anonymous → remember intent, 303 /user/login
//!     → RequireGuest: Authenticated → 303 /
//! ```
//!
//! The gate never checks credentials. It only reflects what the login
//! handler already wrote into the session.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::header::CACHE_CONTROL;
use axum::http::{HeaderValue, Method};
use axum::response::{IntoResponse, Redirect, Response};

use crate::error::AppError;
use crate::http::context::Context;
use crate::http::middleware::{Middleware, Next};
use crate::models::{UserId, UserStore};
use crate::session::{AUTHENTICATED_USER_ID, REDIRECT_AFTER_LOGIN};

/// Login page protected routes bounce to.
pub const LOGIN_PATH: &str = "/user/login";

/// Where authenticated visitors of guest-only pages land.
pub const HOME_PATH: &str = "/";

/// Who is making the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthState {
    #[default]
    Anonymous,
    Authenticated(UserId),
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated(_))
    }

    pub fn user_id(&self) -> Option<UserId> {
        match self {
            AuthState::Authenticated(id) => Some(*id),
            AuthState::Anonymous => None,
        }
    }
}

/// Projects session state into [`AuthState`] for every dynamic route.
pub struct Authenticate {
    users: Arc<dyn UserStore>,
}

impl Authenticate {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    async fn resolve(&self, user_id: Option<UserId>) -> Result<AuthState, AppError> {
        let Some(id) = user_id else {
            return Ok(AuthState::Anonymous);
        };

        // A user deleted since login no longer counts.
        if self.users.exists(id).await? {
            Ok(AuthState::Authenticated(id))
        } else {
            tracing::debug!(user_id = id, "session refers to unknown user");
            Ok(AuthState::Anonymous)
        }
    }
}

#[async_trait]
impl Middleware for Authenticate {
    async fn handle(&self, mut cx: Context, next: Next) -> Response {
        let user_id = cx
            .session()
            .and_then(|s| s.get::<UserId>(AUTHENTICATED_USER_ID));
        let auth = match self.resolve(user_id).await {
            Ok(auth) => auth,
            Err(e) => return e.into_response_for(cx.method(), cx.uri()),
        };
        cx.set_auth(auth);
        next.run(cx).await
    }
}

/// Accept only local absolute paths as post-login destinations.
pub fn safe_redirect_target(target: &str) -> Option<&str> {
    let local = target.starts_with('/')
        && !target.starts_with("//")
        && !target.starts_with("/\\")
        && !target.chars().any(|c| c.is_control());
    local.then_some(target)
}

/// Redirects anonymous callers to the login page.
#[derive(Debug, Default, Clone, Copy)]
pub struct RequireAuthentication;

#[async_trait]
impl Middleware for RequireAuthentication {
    async fn handle(&self, cx: Context, next: Next) -> Response {
        if !cx.is_authenticated() {
            let method = cx.method();
            if *method == Method::GET || *method == Method::HEAD {
                let intent = cx
                    .uri()
                    .path_and_query()
                    .map(|pq| pq.as_str().to_string())
                    .unwrap_or_else(|| cx.uri().path().to_string());
                if let Some(session) = cx.session() {
                    if let Err(e) = session.insert(REDIRECT_AFTER_LOGIN, intent) {
                        return AppError::from(e).into_response_for(cx.method(), cx.uri());
                    }
                }
            }
            return Redirect::to(LOGIN_PATH).into_response();
        }

        let mut response = next.run(cx).await;
        response
            .headers_mut()
            .insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
        response
    }
}

/// Sends authenticated callers away from signup/login pages.
#[derive(Debug, Default, Clone, Copy)]
pub struct RequireGuest;

#[async_trait]
impl Middleware for RequireGuest {
    async fn handle(&self, cx: Context, next: Next) -> Response {
        if cx.is_authenticated() {
            return Redirect::to(HOME_PATH).into_response();
        }
        next.run(cx).await
    }
}
