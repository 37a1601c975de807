//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path)
//!     → router.rs (route lookup, static mount)
//!     → matcher.rs (exact path or trailing `{name}` segment)
//!     → matched endpoint with RouteParams, or 404
//!
//! Route Compilation (at startup):
//!     (method, pattern, chain.then(handler))[]
//!     → compile patterns
//!     → freeze as immutable Router
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path
//! - Deterministic: same input always matches same route
//! - First match wins (registration order)

pub mod matcher;
pub mod router;

pub use matcher::{PathPattern, RouteParams};
pub use router::Router;
