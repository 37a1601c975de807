//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! listen address
//!     → listener.rs (resolve, bind)
//!     → tls.rs (optional certificate loading)
//!     → Hand off to HTTP layer
//! ```
//!
//! # Design Decisions
//! - TLS is optional and handled by the server transparently
//! - Bind errors carry the address that failed

pub mod listener;
pub mod tls;
