//! Load-and-save interceptor for dynamic routes.

use std::sync::Arc;

use async_trait::async_trait;
use axum::response::Response;

use crate::error::AppError;
use crate::http::context::Context;
use crate::http::middleware::{Middleware, Next};
use crate::session::manager::SessionManager;

/// Attaches the caller's session before the handler and persists it after.
pub struct LoadAndSave {
    manager: Arc<SessionManager>,
}

impl LoadAndSave {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl Middleware for LoadAndSave {
    async fn handle(&self, mut cx: Context, next: Next) -> Response {
        let session = self.manager.load(cx.headers()).await;
        cx.set_session(session.clone());

        let method = cx.method().clone();
        let uri = cx.uri().clone();
        let mut response = next.run(cx).await;

        match self.manager.save(&session, &mut response).await {
            Ok(()) => response,
            Err(e) => AppError::from(e).into_response_for(&method, &uri),
        }
    }
}
