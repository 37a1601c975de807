//! Fault containment for a single request.
//!
//! Sits outermost. A panic anywhere downstream becomes a generic 500 with
//! `Connection: close`, so the connection that carried the faulty request
//! is not reused for unrelated requests. The 500 still carries the request
//! ID and the common security headers.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use axum::http::header::CONNECTION;
use axum::http::{HeaderValue, StatusCode};
use axum::response::Response;
use futures_util::FutureExt;

use crate::error::status_response;
use crate::http::context::Context;
use crate::http::middleware::common_headers;
use crate::http::middleware::request_log::{ensure_request_id, X_REQUEST_ID};
use crate::http::middleware::{Middleware, Next};

/// Catch-all boundary converting panics into server faults.
#[derive(Debug, Default, Clone, Copy)]
pub struct Recover;

#[async_trait]
impl Middleware for Recover {
    async fn handle(&self, mut cx: Context, next: Next) -> Response {
        let request_id = ensure_request_id(&mut cx);
        let method = cx.method().clone();
        let uri = cx.uri().clone();

        match AssertUnwindSafe(next.run(cx)).catch_unwind().await {
            Ok(response) => response,
            Err(panic) => {
                tracing::error!(
                    method = %method,
                    uri = %uri,
                    request_id = ?request_id,
                    error = %panic_message(panic.as_ref()),
                    "recovered from panic"
                );
                let mut response = status_response(StatusCode::INTERNAL_SERVER_ERROR);
                let headers = response.headers_mut();
                headers.insert(CONNECTION, HeaderValue::from_static("close"));
                headers.insert(X_REQUEST_ID, request_id);
                common_headers::apply(headers);
                response
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::middleware::tests::empty_request;
    use crate::http::middleware::{endpoint_fn, Chain};
    use axum::response::IntoResponse;

    #[tokio::test]
    async fn panic_becomes_500_and_closes_connection() {
        let endpoint = Chain::new().with(Recover).then(endpoint_fn(|_cx| async {
            if true {
                panic!("handler exploded");
            }
            "unreachable".into_response()
        }));

        let response = endpoint.call(empty_request("/boom")).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()[CONNECTION], "close");
        assert!(response.headers().contains_key(X_REQUEST_ID));
        assert_eq!(response.headers()[axum::http::header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"Internal Server Error");
    }

    #[tokio::test]
    async fn healthy_responses_pass_through_untouched() {
        let endpoint = Chain::new()
            .with(Recover)
            .then(endpoint_fn(|_cx| async { "fine".into_response() }));

        let response = endpoint.call(empty_request("/")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(CONNECTION).is_none());
    }

    #[test]
    fn extracts_panic_messages() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        let borrowed: Box<dyn Any + Send> = Box::new("borrowed");
        let other: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(owned.as_ref()), "owned");
        assert_eq!(panic_message(borrowed.as_ref()), "borrowed");
        assert_eq!(panic_message(other.as_ref()), "non-string panic payload");
    }
}
