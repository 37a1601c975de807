//! Cross-site request forgery guard.
//!
//! Each session carries one token, bound to the session token it was issued
//! for. The token is stable across requests (multi-tab forms keep working)
//! and is reissued only when the session token rotates. Safe methods get
//! the token exposed for rendering; everything else must echo it back in
//! the `csrf_token` form field or the `X-CSRF-Token` header.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, Method, StatusCode};
use axum::response::Response;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::error::AppError;
use crate::http::context::Context;
use crate::http::middleware::{Middleware, Next};
use crate::session::{token, Session};

/// Form field carrying the token.
pub const CSRF_FIELD: &str = "csrf_token";

/// Header alternative for non-form clients.
pub const CSRF_HEADER: HeaderName = HeaderName::from_static("x-csrf-token");

const SESSION_KEY: &str = "csrf";

/// Token as stored in the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsrfToken {
    pub value: String,
    pub bound_to: String,
}

/// Return the session's token, issuing a new one if none is bound to the
/// current session token.
pub fn issue(session: &Session) -> Result<String, AppError> {
    let current = session.token();
    if let Some(existing) = session.get::<CsrfToken>(SESSION_KEY) {
        if existing.bound_to == current {
            return Ok(existing.value);
        }
    }

    let fresh = CsrfToken {
        value: token::generate(),
        bound_to: current,
    };
    session
        .insert(SESSION_KEY, &fresh)
        .map_err(AppError::from)?;
    Ok(fresh.value)
}

/// Constant-time comparison; length mismatch is a plain mismatch.
pub fn tokens_match(submitted: &str, expected: &str) -> bool {
    bool::from(submitted.as_bytes().ct_eq(expected.as_bytes()))
}

fn is_safe(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE)
}

fn is_urlencoded_form(cx: &Context) -> bool {
    cx.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/x-www-form-urlencoded"))
        .unwrap_or(false)
}

/// Interceptor enforcing the token on state-changing requests.
pub struct CsrfGuard {
    max_body_size: usize,
}

impl CsrfGuard {
    pub fn new(max_body_size: usize) -> Self {
        Self { max_body_size }
    }

    /// Pull the submitted token out of the header or the form body.
    ///
    /// The body is buffered and handed back intact for the handler.
    async fn submitted_token(&self, cx: &mut Context) -> Result<Option<String>, AppError> {
        if let Some(value) = cx.headers().get(&CSRF_HEADER) {
            return Ok(value.to_str().ok().map(str::to_string));
        }
        if !is_urlencoded_form(cx) {
            return Ok(None);
        }

        let body = std::mem::take(cx.request_mut().body_mut());
        let bytes = axum::body::to_bytes(body, self.max_body_size)
            .await
            .map_err(|e| {
                tracing::debug!(error = %e, "failed to buffer form body");
                AppError::ClientError(StatusCode::BAD_REQUEST)
            })?;

        let submitted = url::form_urlencoded::parse(&bytes)
            .find(|(key, _)| key == CSRF_FIELD)
            .map(|(_, value)| value.into_owned());
        cx.replace_body(Body::from(bytes));
        Ok(submitted)
    }
}

#[async_trait]
impl Middleware for CsrfGuard {
    async fn handle(&self, mut cx: Context, next: Next) -> Response {
        let method = cx.method().clone();
        let uri = cx.uri().clone();

        let verified = async {
            let session = cx.require_session()?;
            let expected = issue(&session)?;

            if !is_safe(&method) {
                let submitted = self.submitted_token(&mut cx).await?;
                let ok = submitted
                    .as_deref()
                    .map(|s| tokens_match(s, &expected))
                    .unwrap_or(false);
                if !ok {
                    tracing::debug!(method = %method, uri = %uri, "CSRF token missing or mismatched");
                    return Err(AppError::ClientError(StatusCode::BAD_REQUEST));
                }
            }
            Ok(expected)
        }
        .await;

        match verified {
            Ok(token) => {
                cx.set_csrf_token(token);
                next.run(cx).await
            }
            Err(e) => e.into_response_for(&method, &uri),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::middleware::{endpoint_fn, Chain, Endpoint};
    use crate::session::{SessionManager, MemoryStore};
    use crate::config::SessionConfig;
    use crate::session::LoadAndSave;
    use axum::extract::Request;
    use axum::response::IntoResponse;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use time::OffsetDateTime;

    fn session() -> Session {
        Session::from_parts(
            "session-token".into(),
            Default::default(),
            OffsetDateTime::now_utc() + time::Duration::hours(1),
        )
    }

    #[test]
    fn token_is_stable_until_rotation() {
        let s = session();
        let first = issue(&s).unwrap();
        assert_eq!(issue(&s).unwrap(), first);

        s.rotate_token();
        let second = issue(&s).unwrap();
        assert_ne!(second, first);
        assert_eq!(issue(&s).unwrap(), second);
    }

    #[test]
    fn comparison() {
        assert!(tokens_match("abc", "abc"));
        assert!(!tokens_match("abd", "abc"));
        assert!(!tokens_match("ab", "abc"));
        assert!(!tokens_match("", "abc"));
    }

    fn guarded(hits: Arc<AtomicUsize>) -> Arc<dyn Endpoint> {
        let manager = Arc::new(SessionManager::new(
            Arc::new(MemoryStore::new()),
            SessionConfig::default(),
        ));
        Chain::new()
            .with(LoadAndSave::new(manager))
            .with(CsrfGuard::new(1024))
            .then(endpoint_fn(move |mut cx: Context| {
                let hits = hits.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    let form: std::collections::HashMap<String, String> =
                        cx.take_form().await.unwrap_or_default();
                    let token = cx.csrf_token().unwrap_or_default().to_string();
                    format!("{}|{}", token, form.get("title").cloned().unwrap_or_default())
                        .into_response()
                }
            }))
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn session_cookie(response: &Response) -> String {
        let raw = response.headers()[axum::http::header::SET_COOKIE].to_str().unwrap();
        raw.split(';').next().unwrap().to_string()
    }

    fn post(cookie: &str, body: String) -> Context {
        Context::new(
            Request::builder()
                .method(Method::POST)
                .uri("/snippet/create")
                .header(axum::http::header::COOKIE, cookie)
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body))
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn post_without_token_is_rejected_before_handler() {
        let hits = Arc::new(AtomicUsize::new(0));
        let endpoint = guarded(hits.clone());

        let response = endpoint.call(post("session=nope", "title=x".into())).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn post_with_matching_token_reaches_handler_with_body() {
        let hits = Arc::new(AtomicUsize::new(0));
        let endpoint = guarded(hits.clone());

        let get = Context::new(Request::builder().uri("/snippet/create").body(Body::empty()).unwrap());
        let response = endpoint.call(get).await;
        let cookie = session_cookie(&response);
        let token = body_string(response).await.split('|').next().unwrap().to_string();
        assert!(!token.is_empty());

        let body = format!("title=Hello&csrf_token={}", token);
        let response = endpoint.call(post(&cookie, body)).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, format!("{}|Hello", token));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn post_with_token_from_other_session_is_rejected() {
        let hits = Arc::new(AtomicUsize::new(0));
        let endpoint = guarded(hits.clone());

        let first = endpoint
            .call(Context::new(Request::builder().uri("/").body(Body::empty()).unwrap()))
            .await;
        let cookie_a = session_cookie(&first);

        let second = endpoint
            .call(Context::new(Request::builder().uri("/").body(Body::empty()).unwrap()))
            .await;
        let token_b = body_string(second).await.split('|').next().unwrap().to_string();

        let response = endpoint
            .call(post(&cookie_a, format!("csrf_token={}", token_b)))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }
}
