//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, body limit, fallback dispatch)
//!     → context.rs (request wrapped in a typed per-request context)
//!     → middleware/ (standard chain: recover, log, common headers)
//!     → routes.rs → routing::Router → dynamic/guest/protected chain
//!     → handler
//! ```

pub mod context;
pub mod middleware;
pub mod routes;
pub mod server;

pub use context::Context;
pub use middleware::request_log::X_REQUEST_ID;
pub use server::HttpServer;
