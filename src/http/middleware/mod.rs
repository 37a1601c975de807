//! Interceptor chain.
//!
//! # Data Flow
//! ```text
//! Chain [m1, m2, ..., mn] + endpoint h
//!     → folded once at startup into m1(m2(...mn(h)))
//!     → m1 sees the request first and the response last
//! ```
//!
//! Chains are immutable values. `append` returns a new chain, so the
//! "dynamic" chain can be extended into the "protected" chain without
//! affecting routes already built from it.

pub mod body_limit;
pub mod common_headers;
pub mod recover;
pub mod request_log;

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use axum::response::Response;

use crate::http::context::Context;

pub use body_limit::BodyLimit;
pub use common_headers::CommonHeaders;
pub use recover::Recover;
pub use request_log::RequestLog;

/// Anything that can turn a request context into a response.
#[async_trait]
pub trait Endpoint: Send + Sync + 'static {
    async fn call(&self, cx: Context) -> Response;
}

/// A single interceptor: inspect or alter the request, decide whether to
/// call `next`, inspect or alter the response.
#[async_trait]
pub trait Middleware: Send + Sync + 'static {
    async fn handle(&self, cx: Context, next: Next) -> Response;
}

/// The remainder of the chain, as seen from an interceptor.
#[derive(Clone)]
pub struct Next {
    inner: Arc<dyn Endpoint>,
}

impl Next {
    pub async fn run(&self, cx: Context) -> Response {
        self.inner.call(cx).await
    }
}

struct Wrapped {
    middleware: Arc<dyn Middleware>,
    next: Next,
}

#[async_trait]
impl Endpoint for Wrapped {
    async fn call(&self, cx: Context) -> Response {
        self.middleware.handle(cx, self.next.clone()).await
    }
}

/// An ordered, immutable list of interceptors.
#[derive(Clone, Default)]
pub struct Chain {
    layers: Vec<Arc<dyn Middleware>>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style push onto the innermost position.
    pub fn with(mut self, middleware: impl Middleware) -> Self {
        self.layers.push(Arc::new(middleware));
        self
    }

    /// A new chain with `middleware` innermost; `self` is left untouched.
    pub fn append(&self, middleware: impl Middleware) -> Self {
        self.clone().with(middleware)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Fold the chain around `endpoint`, outermost first.
    pub fn then(&self, endpoint: impl Endpoint) -> Arc<dyn Endpoint> {
        self.then_arc(Arc::new(endpoint))
    }

    pub fn then_arc(&self, endpoint: Arc<dyn Endpoint>) -> Arc<dyn Endpoint> {
        self.layers.iter().rev().fold(endpoint, |inner, middleware| {
            Arc::new(Wrapped {
                middleware: Arc::clone(middleware),
                next: Next { inner },
            })
        })
    }
}

/// Adapter turning an async closure into an [`Endpoint`].
pub struct EndpointFn<F, Fut> {
    f: F,
    _fut: PhantomData<fn() -> Fut>,
}

/// Wrap `f` as an endpoint.
pub fn endpoint_fn<F, Fut>(f: F) -> EndpointFn<F, Fut>
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    EndpointFn { f, _fut: PhantomData }
}

#[async_trait]
impl<F, Fut> Endpoint for EndpointFn<F, Fut>
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    async fn call(&self, cx: Context) -> Response {
        (self.f)(cx).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::Request;
    use axum::http::HeaderValue;
    use axum::response::IntoResponse;
    use std::sync::Mutex;

    /// Records its name on the way in and on the way out.
    struct Trace {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Middleware for Trace {
        async fn handle(&self, cx: Context, next: Next) -> Response {
            self.log.lock().unwrap().push(format!("in:{}", self.name));
            let mut response = next.run(cx).await;
            self.log.lock().unwrap().push(format!("out:{}", self.name));
            response
                .headers_mut()
                .append("x-seen", HeaderValue::from_static(self.name));
            response
        }
    }

    pub(crate) fn empty_request(uri: &str) -> Context {
        Context::new(Request::builder().uri(uri).body(Body::empty()).unwrap())
    }

    #[tokio::test]
    async fn folds_outermost_first() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = Chain::new()
            .with(Trace { name: "m1", log: log.clone() })
            .with(Trace { name: "m2", log: log.clone() });

        let handler_log = log.clone();
        let endpoint = chain.then(endpoint_fn(move |_cx| {
            let log = handler_log.clone();
            async move {
                log.lock().unwrap().push("handler".into());
                "ok".into_response()
            }
        }));

        let response = endpoint.call(empty_request("/")).await;

        assert_eq!(
            *log.lock().unwrap(),
            vec!["in:m1", "in:m2", "handler", "out:m2", "out:m1"]
        );
        let seen: Vec<_> = response.headers().get_all("x-seen").iter().collect();
        assert_eq!(seen, vec!["m2", "m1"]);
    }

    #[tokio::test]
    async fn append_does_not_mutate_original() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let base = Chain::new().with(Trace { name: "base", log: log.clone() });
        let extended = base.append(Trace { name: "extra", log: log.clone() });

        assert_eq!(base.len(), 1);
        assert_eq!(extended.len(), 2);

        base.then(endpoint_fn(|_cx| async { "ok".into_response() }))
            .call(empty_request("/"))
            .await;
        assert_eq!(*log.lock().unwrap(), vec!["in:base", "out:base"]);
    }
}
