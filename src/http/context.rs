//! Per-request context threaded through the interceptor chain.
//!
//! Every stage receives the context by value and hands it to the next one.
//! Stages add typed state as they go: the router sets path parameters, the
//! session manager attaches the session, the CSRF guard exposes its token,
//! and the authentication gate records who is calling. Nothing here
//! outlives the request.

use axum::body::Body;
use axum::extract::{ConnectInfo, FromRequest, Request};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::Form;
use serde::de::DeserializeOwned;
use std::net::SocketAddr;

use crate::error::AppError;
use crate::routing::RouteParams;
use crate::security::auth::AuthState;
use crate::session::Session;

/// State carried alongside a request while it moves through the pipeline.
#[derive(Debug)]
pub struct Context {
    request: Request,
    params: RouteParams,
    session: Option<Session>,
    csrf_token: Option<String>,
    auth: Option<AuthState>,
}

impl Context {
    pub fn new(request: Request) -> Self {
        Self {
            request,
            params: RouteParams::default(),
            session: None,
            csrf_token: None,
            auth: None,
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn request_mut(&mut self) -> &mut Request {
        &mut self.request
    }

    pub fn into_request(self) -> Request {
        self.request
    }

    pub fn method(&self) -> &Method {
        self.request.method()
    }

    pub fn uri(&self) -> &Uri {
        self.request.uri()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.request.headers()
    }

    /// Peer address, when the server was started with connect info.
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr)
    }

    /// Named segment captured by the matched route.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    pub(crate) fn set_params(&mut self, params: RouteParams) {
        self.params = params;
    }

    /// Session attached by the session manager, if this is a dynamic route.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// The session, or a server fault when the route was wired without one.
    pub fn require_session(&self) -> Result<Session, AppError> {
        self.session
            .clone()
            .ok_or_else(|| AppError::ServerFault(anyhow::anyhow!("route has no session middleware")))
    }

    pub(crate) fn set_session(&mut self, session: Session) {
        self.session = Some(session);
    }

    /// Anti-forgery token to embed in rendered forms.
    pub fn csrf_token(&self) -> Option<&str> {
        self.csrf_token.as_deref()
    }

    pub(crate) fn set_csrf_token(&mut self, token: String) {
        self.csrf_token = Some(token);
    }

    /// Authentication state. Anonymous until the gate has run.
    pub fn auth(&self) -> &AuthState {
        self.auth.as_ref().unwrap_or(&AuthState::Anonymous)
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth().is_authenticated()
    }

    /// Record the caller's identity. The first annotation sticks.
    pub(crate) fn set_auth(&mut self, auth: AuthState) {
        if self.auth.is_none() {
            self.auth = Some(auth);
        }
    }

    /// Decode an urlencoded form body, leaving the request body empty.
    ///
    /// Any decode failure is a 400.
    pub async fn take_form<T: DeserializeOwned>(&mut self) -> Result<T, AppError> {
        let body = std::mem::take(self.request.body_mut());
        let mut request = Request::new(body);
        *request.method_mut() = self.request.method().clone();
        *request.uri_mut() = self.request.uri().clone();
        *request.headers_mut() = self.request.headers().clone();

        match Form::<T>::from_request(request, &()).await {
            Ok(Form(form)) => Ok(form),
            Err(rejection) => {
                tracing::debug!(error = %rejection, "failed to decode form");
                Err(AppError::ClientError(StatusCode::BAD_REQUEST))
            }
        }
    }

    /// Swap in a new body, e.g. after an interceptor buffered the original.
    pub(crate) fn replace_body(&mut self, body: Body) {
        *self.request.body_mut() = body;
    }
}
