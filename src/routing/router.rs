//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store compiled routes
//! - Look up the route for `(method, path)`
//! - Serve the static asset mount
//! - Answer everything else with 404
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan over routes (acceptable for typical route counts)
//! - A path registered for another method is still a 404, not a 405
//! - GET routes also answer HEAD

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use tower::ServiceExt;
use tower_http::services::ServeDir;

use crate::error::status_response;
use crate::http::context::Context;
use crate::http::middleware::Endpoint;
use crate::routing::matcher::PathPattern;

struct Route {
    method: Method,
    pattern: PathPattern,
    endpoint: Arc<dyn Endpoint>,
}

struct StaticMount {
    prefix: String,
    files: ServeDir,
}

/// Method + path dispatcher. Built once at startup.
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
    assets: Option<StaticMount>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `endpoint` for `method` on `pattern`.
    pub fn route(mut self, method: Method, pattern: &str, endpoint: Arc<dyn Endpoint>) -> Self {
        self.routes.push(Route {
            method,
            pattern: PathPattern::parse(pattern),
            endpoint,
        });
        self
    }

    pub fn get(self, pattern: &str, endpoint: Arc<dyn Endpoint>) -> Self {
        self.route(Method::GET, pattern, endpoint)
    }

    pub fn post(self, pattern: &str, endpoint: Arc<dyn Endpoint>) -> Self {
        self.route(Method::POST, pattern, endpoint)
    }

    /// Serve files under `dir` for GET/HEAD requests below `prefix`.
    /// `prefix` must end in `/`.
    pub fn assets(mut self, prefix: &str, dir: impl AsRef<Path>) -> Self {
        self.assets = Some(StaticMount {
            prefix: prefix.to_string(),
            files: ServeDir::new(dir),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    fn lookup(&self, method: &Method, path: &str) -> Option<(&Route, crate::routing::RouteParams)> {
        let accepts = |route: &Route| {
            route.method == *method || (*method == Method::HEAD && route.method == Method::GET)
        };
        self.routes
            .iter()
            .filter(|route| accepts(route))
            .find_map(|route| route.pattern.matches(path).map(|params| (route, params)))
    }

    async fn serve_asset(&self, mount: &StaticMount, cx: Context) -> Response {
        let mut request = cx.into_request();
        let rest = request
            .uri()
            .path()
            .strip_prefix(mount.prefix.as_str())
            .unwrap_or_default()
            .to_string();
        if rest.is_empty() {
            // Directory listings are never served.
            return status_response(StatusCode::NOT_FOUND);
        }
        let rewritten = format!("/{}", rest);
        match rewritten.parse::<Uri>() {
            Ok(uri) => *request.uri_mut() = uri,
            Err(_) => return status_response(StatusCode::NOT_FOUND),
        }

        match mount.files.clone().oneshot(request).await {
            Ok(response) if response.status() == StatusCode::NOT_FOUND => {
                status_response(StatusCode::NOT_FOUND)
            }
            Ok(response) => response.map(Body::new).into_response(),
            Err(never) => match never {},
        }
    }
}

#[async_trait]
impl Endpoint for Router {
    async fn call(&self, mut cx: Context) -> Response {
        let method = cx.method().clone();
        let path = cx.uri().path().to_string();

        if let Some(mount) = &self.assets {
            if path.starts_with(mount.prefix.as_str()) {
                if method == Method::GET || method == Method::HEAD {
                    return self.serve_asset(mount, cx).await;
                }
                return status_response(StatusCode::NOT_FOUND);
            }
        }

        match self.lookup(&method, &path) {
            Some((route, params)) => {
                cx.set_params(params);
                route.endpoint.call(cx).await
            }
            None => {
                tracing::debug!(method = %method, path = %path, "no route matched");
                status_response(StatusCode::NOT_FOUND)
            }
        }
    }
}
