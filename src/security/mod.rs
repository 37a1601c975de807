//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Dynamic route (session already loaded):
//!     → csrf.rs (issue token; reject unsafe methods without a match)
//!     → auth.rs Authenticate (session → AuthState)
//!     → auth.rs RequireAuthentication / RequireGuest (protected / guest routes)
//!     → handler
//! ```
//!
//! # Design Decisions
//! - Fail closed: a failed check never reaches the handler
//! - No trust in client input: redirect targets are validated before use

pub mod auth;
pub mod csrf;

pub use auth::{AuthState, Authenticate, RequireAuthentication, RequireGuest};
pub use csrf::CsrfGuard;
