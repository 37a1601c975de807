//! Snippetbox: share short-lived text snippets.
//!
//! Every request runs through one pipeline folded at startup:
//! panic recovery, request logging, and security headers for all routes;
//! session load/save, CSRF verification, and the authentication gate for
//! dynamic routes.

pub mod config;
pub mod error;
pub mod handlers;
pub mod http;
pub mod lifecycle;
pub mod models;
pub mod net;
pub mod observability;
pub mod routing;
pub mod security;
pub mod session;
pub mod templates;
pub mod validator;

pub use config::AppConfig;
pub use error::AppError;
pub use handlers::AppState;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
