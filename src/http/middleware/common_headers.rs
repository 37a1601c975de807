//! Security headers added to every response.

use async_trait::async_trait;
use axum::http::header::{
    CONTENT_SECURITY_POLICY, REFERRER_POLICY, SERVER, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS,
    X_XSS_PROTECTION,
};
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::response::Response;

use crate::http::context::Context;
use crate::http::middleware::{Middleware, Next};

const HEADERS: [(HeaderName, &str); 6] = [
    (
        CONTENT_SECURITY_POLICY,
        "default-src 'self'; style-src 'self' fonts.googleapis.com; font-src fonts.gstatic.com",
    ),
    (REFERRER_POLICY, "origin-when-cross-origin"),
    (X_CONTENT_TYPE_OPTIONS, "nosniff"),
    (X_FRAME_OPTIONS, "deny"),
    // Legacy XSS auditors do more harm than good; turn them off.
    (X_XSS_PROTECTION, "0"),
    (SERVER, "snippetbox"),
];

/// Sets CSP, framing, sniffing and referrer policies.
///
/// Headers a downstream stage already set are left alone.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommonHeaders;

#[async_trait]
impl Middleware for CommonHeaders {
    async fn handle(&self, cx: Context, next: Next) -> Response {
        let mut response = next.run(cx).await;
        apply(response.headers_mut());
        response
    }
}

/// Fill in any security header not already present.
pub fn apply(headers: &mut HeaderMap) {
    for (name, value) in HEADERS {
        if !headers.contains_key(&name) {
            headers.insert(name, HeaderValue::from_static(value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::middleware::tests::empty_request;
    use crate::http::middleware::{endpoint_fn, Chain};
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    #[tokio::test]
    async fn applies_to_every_status() {
        let endpoint = Chain::new()
            .with(CommonHeaders)
            .then(endpoint_fn(|_cx| async { StatusCode::NOT_FOUND.into_response() }));

        let response = endpoint.call(empty_request("/missing")).await;
        let headers = response.headers();
        assert_eq!(headers[X_FRAME_OPTIONS], "deny");
        assert_eq!(headers[X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(headers[REFERRER_POLICY], "origin-when-cross-origin");
        assert_eq!(headers[X_XSS_PROTECTION], "0");
        assert!(headers[CONTENT_SECURITY_POLICY]
            .to_str()
            .unwrap()
            .starts_with("default-src 'self'"));
    }
}
