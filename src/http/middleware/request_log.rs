//! One structured log entry per request.
//!
//! A panic unwinding through this stage is logged and counted as a 500,
//! then resumed so the recovery boundary above still handles it.

use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

use async_trait::async_trait;
use axum::http::{HeaderName, HeaderValue, Method, StatusCode, Version};
use axum::response::Response;
use futures_util::FutureExt;
use tracing::{Instrument, Span};
use uuid::Uuid;

use crate::http::context::Context;
use crate::http::middleware::{Middleware, Next};
use crate::observability::metrics;

/// Header used for request correlation.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Return the request's ID, generating and attaching one if absent.
pub fn ensure_request_id(cx: &mut Context) -> HeaderValue {
    if let Some(value) = cx.headers().get(&X_REQUEST_ID) {
        return value.clone();
    }
    let generated = HeaderValue::from_str(&Uuid::new_v4().to_string())
        .unwrap_or_else(|_| HeaderValue::from_static("unknown"));
    cx.request_mut()
        .headers_mut()
        .insert(X_REQUEST_ID, generated.clone());
    generated
}

struct Entry {
    span: Span,
    method: Method,
    version: Version,
    remote: Option<SocketAddr>,
    start: Instant,
}

impl Entry {
    fn finish(&self, status: StatusCode) {
        let latency = self.start.elapsed();
        self.span.in_scope(|| {
            tracing::info!(
                proto = ?self.version,
                remote = ?self.remote,
                status = status.as_u16(),
                latency_ms = latency.as_secs_f64() * 1000.0,
                "received request"
            );
        });
        metrics::record_request(self.method.as_str(), status.as_u16(), self.start);
    }
}

/// Logs method, URI, status, and latency; tags the request with an ID.
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestLog;

#[async_trait]
impl Middleware for RequestLog {
    async fn handle(&self, mut cx: Context, next: Next) -> Response {
        let start = Instant::now();
        let request_id = ensure_request_id(&mut cx);

        let method = cx.method().clone();
        let id = request_id.to_str().unwrap_or("invalid").to_string();
        let span = tracing::info_span!("http_request", method = %method, uri = %cx.uri(), request_id = %id);
        let entry = Entry {
            span: span.clone(),
            method,
            version: cx.request().version(),
            remote: cx.remote_addr(),
            start,
        };

        match AssertUnwindSafe(next.run(cx).instrument(span)).catch_unwind().await {
            Ok(mut response) => {
                entry.finish(response.status());
                response.headers_mut().insert(X_REQUEST_ID, request_id);
                response
            }
            Err(panic) => {
                entry.finish(StatusCode::INTERNAL_SERVER_ERROR);
                std::panic::resume_unwind(panic)
            }
        }
    }
}
