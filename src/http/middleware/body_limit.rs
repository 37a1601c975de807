//! Request body cap.
//!
//! Runs inside the standard chain, so a 413 is logged and carries the same
//! headers as any other response. A declared `Content-Length` over the cap
//! is rejected up front; streamed bodies are wrapped so reading past the cap
//! fails.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::CONTENT_LENGTH;
use axum::http::StatusCode;
use axum::response::Response;
use http_body_util::Limited;

use crate::error::AppError;
use crate::http::context::Context;
use crate::http::middleware::{Middleware, Next};

/// Rejects or truncates request bodies larger than `max` bytes.
#[derive(Debug, Clone, Copy)]
pub struct BodyLimit {
    max: usize,
}

impl BodyLimit {
    pub fn new(max: usize) -> Self {
        Self { max }
    }
}

#[async_trait]
impl Middleware for BodyLimit {
    async fn handle(&self, mut cx: Context, next: Next) -> Response {
        let declared = cx
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());

        if declared.is_some_and(|len| len > self.max as u64) {
            tracing::debug!(declared = ?declared, max = self.max, "request body too large");
            return AppError::ClientError(StatusCode::PAYLOAD_TOO_LARGE)
                .into_response_for(cx.method(), cx.uri());
        }

        let body = std::mem::take(cx.request_mut().body_mut());
        cx.replace_body(Body::new(Limited::new(body, self.max)));
        next.run(cx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::middleware::request_log::X_REQUEST_ID;
    use crate::http::middleware::{endpoint_fn, Chain, CommonHeaders, RequestLog};
    use axum::extract::Request;
    use axum::http::header::X_FRAME_OPTIONS;
    use axum::http::Method;
    use axum::response::IntoResponse;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn post(body: &'static str, declared: Option<usize>) -> Context {
        let mut builder = Request::builder().method(Method::POST).uri("/snippet/create");
        if let Some(len) = declared {
            builder = builder.header(CONTENT_LENGTH, len);
        }
        Context::new(builder.body(Body::from(body)).unwrap())
    }

    #[tokio::test]
    async fn oversized_declared_length_passes_through_standard_chain() {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let endpoint = Chain::new()
            .with(RequestLog)
            .with(CommonHeaders)
            .with(BodyLimit::new(8))
            .then(endpoint_fn(move |_cx| {
                let h = h.clone();
                async move {
                    h.fetch_add(1, Ordering::SeqCst);
                    "ok".into_response()
                }
            }));

        let response = endpoint.call(post("far too long for the cap", Some(24))).await;

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(response.headers().contains_key(&X_REQUEST_ID));
        assert_eq!(response.headers()[X_FRAME_OPTIONS], "deny");
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn undeclared_body_is_capped_when_read() {
        let endpoint = Chain::new()
            .with(BodyLimit::new(8))
            .then(endpoint_fn(|cx: Context| async move {
                match axum::body::to_bytes(cx.into_request().into_body(), usize::MAX).await {
                    Ok(_) => "read".into_response(),
                    Err(_) => StatusCode::PAYLOAD_TOO_LARGE.into_response(),
                }
            }));

        let response = endpoint.call(post("far too long for the cap", None)).await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

        let response = endpoint.call(post("short", Some(5))).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
