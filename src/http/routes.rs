//! Route table and interceptor chains.
//!
//! # Data Flow
//! ```text
//! standard  = [Recover, RequestLog, CommonHeaders, BodyLimit] (every request)
//! dynamic   = [LoadAndSave, CsrfGuard, Authenticate]         (session-aware pages)
//! guest     = dynamic + RequireGuest                         (signup / login)
//! protected = dynamic + RequireAuthentication                (account, create, logout)
//!
//! effective = standard(Router(route → chain(handler)))
//! ```

use std::sync::Arc;

use crate::handlers::{self, account, handler, snippets, users, AppState};
use crate::http::middleware::{BodyLimit, Chain, CommonHeaders, Endpoint, Recover, RequestLog};
use crate::routing::Router;
use crate::security::{Authenticate, CsrfGuard, RequireAuthentication, RequireGuest};
use crate::session::LoadAndSave;

/// Path prefix for static assets.
pub const STATIC_PREFIX: &str = "/static/";

/// Interceptors wrapping every request, outermost first.
pub fn standard_chain(max_body_size: usize) -> Chain {
    Chain::new()
        .with(Recover)
        .with(RequestLog)
        .with(CommonHeaders)
        .with(BodyLimit::new(max_body_size))
}

/// Interceptors for pages that need the session.
pub fn dynamic_chain(state: &Arc<AppState>) -> Chain {
    Chain::new()
        .with(LoadAndSave::new(Arc::clone(&state.sessions)))
        .with(CsrfGuard::new(state.config.http.max_body_size))
        .with(Authenticate::new(Arc::clone(&state.users)))
}

/// Build the effective endpoint for the whole application.
pub fn routes(state: &Arc<AppState>) -> Arc<dyn Endpoint> {
    let dynamic = dynamic_chain(state);
    let guest = dynamic.append(RequireGuest);
    let protected = dynamic.append(RequireAuthentication);

    let router = Router::new()
        .assets(STATIC_PREFIX, &state.config.http.static_dir)
        .get("/ping", Arc::new(handler(state, handlers::ping)))
        .get("/", dynamic.then(handler(state, handlers::home)))
        .get("/about", dynamic.then(handler(state, handlers::about)))
        .get("/snippet/view/{id}", dynamic.then(handler(state, snippets::snippet_view)))
        .get("/user/signup", guest.then(handler(state, users::user_signup)))
        .post("/user/signup", guest.then(handler(state, users::user_signup_post)))
        .get("/user/login", guest.then(handler(state, users::user_login)))
        .post("/user/login", guest.then(handler(state, users::user_login_post)))
        .post("/user/logout", protected.then(handler(state, users::user_logout_post)))
        .get("/snippet/create", protected.then(handler(state, snippets::snippet_create)))
        .post("/snippet/create", protected.then(handler(state, snippets::snippet_create_post)))
        .get("/account/view", protected.then(handler(state, account::account_view)))
        .get(
            "/account/password/update",
            protected.then(handler(state, account::account_password_update)),
        )
        .post(
            "/account/password/update",
            protected.then(handler(state, account::account_password_update_post)),
        );

    tracing::debug!(routes = router.len(), "Route table built");
    standard_chain(state.config.http.max_body_size).then(router)
}
