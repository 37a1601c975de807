//! Request handlers and the dependencies they share.
//!
//! # Data Flow
//! ```text
//! Router match
//!     → Handler adapter (state + context)
//!     → handler fn returns Result<Response, AppError>
//!     → errors classified once, here, with method/URI context
//! ```

pub mod account;
pub mod snippets;
pub mod users;

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use serde::Serialize;
use time::OffsetDateTime;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::http::context::Context;
use crate::http::middleware::Endpoint;
use crate::models::{MemorySnippetStore, MemoryUserStore, SnippetStore, UserStore};
use crate::session::{MemoryStore, SessionManager, FLASH};
use crate::templates::{RenderError, SnippetView, TemplateCache, TemplateData};
use crate::validator::Validator;

/// Collaborators built once at startup and handed to every handler.
pub struct AppState {
    pub config: AppConfig,
    pub snippets: Arc<dyn SnippetStore>,
    pub users: Arc<dyn UserStore>,
    pub templates: TemplateCache,
    pub sessions: Arc<SessionManager>,
}

impl AppState {
    /// Wire the in-memory stores and compile the templates.
    pub fn in_memory(config: AppConfig) -> Result<Self, RenderError> {
        let sessions = SessionManager::new(Arc::new(MemoryStore::new()), config.session.clone());
        Ok(Self {
            snippets: Arc::new(MemorySnippetStore::new()),
            users: Arc::new(MemoryUserStore::new()),
            templates: TemplateCache::new()?,
            sessions: Arc::new(sessions),
            config,
        })
    }
}

/// Adapter from a handler fn to an [`Endpoint`].
pub struct Handler<F, Fut> {
    state: Arc<AppState>,
    f: F,
    _fut: PhantomData<fn() -> Fut>,
}

pub fn handler<F, Fut>(state: &Arc<AppState>, f: F) -> Handler<F, Fut>
where
    F: Fn(Arc<AppState>, Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, AppError>> + Send + 'static,
{
    Handler {
        state: Arc::clone(state),
        f,
        _fut: PhantomData,
    }
}

#[async_trait]
impl<F, Fut> Endpoint for Handler<F, Fut>
where
    F: Fn(Arc<AppState>, Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, AppError>> + Send + 'static,
{
    async fn call(&self, cx: Context) -> Response {
        let method = cx.method().clone();
        let uri = cx.uri().clone();
        match (self.f)(Arc::clone(&self.state), cx).await {
            Ok(response) => response,
            Err(e) => e.into_response_for(&method, &uri),
        }
    }
}

/// Page data every template needs. Consumes the flash message.
pub(crate) fn template_data(cx: &Context) -> TemplateData {
    TemplateData {
        current_year: OffsetDateTime::now_utc().year(),
        flash: cx.session().and_then(|s| s.pop_string(FLASH)),
        is_authenticated: cx.is_authenticated(),
        csrf_token: cx.csrf_token().unwrap_or_default().to_string(),
        ..Default::default()
    }
}

pub(crate) fn render(
    state: &AppState,
    status: StatusCode,
    page: &str,
    data: &TemplateData,
) -> Result<Response, AppError> {
    let html = state.templates.render(page, data)?;
    Ok((status, Html(html)).into_response())
}

/// Form values plus their validation errors, as templates expect them.
pub(crate) fn form_value<T: Serialize>(form: &T, v: &Validator) -> Result<serde_json::Value, AppError> {
    let mut value = serde_json::to_value(form)?;
    if let Some(map) = value.as_object_mut() {
        map.insert("field_errors".into(), serde_json::to_value(&v.field_errors)?);
        map.insert("non_field_errors".into(), serde_json::to_value(&v.non_field_errors)?);
    }
    Ok(value)
}

pub(crate) fn set_flash(cx: &Context, message: &str) -> Result<(), AppError> {
    cx.require_session()?.insert(FLASH, message)?;
    Ok(())
}

pub async fn ping(_state: Arc<AppState>, _cx: Context) -> Result<Response, AppError> {
    Ok("OK".into_response())
}

pub async fn home(state: Arc<AppState>, cx: Context) -> Result<Response, AppError> {
    let snippets = state.snippets.latest().await?;

    let mut data = template_data(&cx);
    data.snippets = snippets.into_iter().map(SnippetView::from).collect();
    render(&state, StatusCode::OK, "home", &data)
}

pub async fn about(state: Arc<AppState>, cx: Context) -> Result<Response, AppError> {
    render(&state, StatusCode::OK, "about", &template_data(&cx))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn test_state() -> Arc<AppState> {
        Arc::new(AppState::in_memory(AppConfig::default()).unwrap())
    }

    #[tokio::test]
    async fn ping_says_ok() {
        let state = test_state();
        let endpoint = handler(&state, ping);
        let cx = Context::new(axum::extract::Request::new(axum::body::Body::empty()));

        let response = endpoint.call(cx).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"OK");
    }

    #[tokio::test]
    async fn handler_errors_become_responses() {
        let state = test_state();
        let endpoint = handler(&state, |_state, _cx| async { Err(AppError::NotFound) });
        let cx = Context::new(axum::extract::Request::new(axum::body::Body::empty()));

        let response = endpoint.call(cx).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
