//! Session subsystem.
//!
//! # Data Flow
//! ```text
//! Request with Cookie: session=<token>
//!     → manager.rs load (store lookup, or fresh session)
//!     → state.rs Session handle attached to the request context
//!     → downstream stages read / mutate / rotate / destroy
//!     → manager.rs save (commit, retire rotated tokens, Set-Cookie)
//!
//! Background:
//!     cleanup.rs sweeps expired records every `cleanup_interval`
//! ```
//!
//! Tokens are 256-bit CSPRNG values. Records are only written when
//! something changed during the request.

pub mod cleanup;
pub mod manager;
pub mod middleware;
pub mod state;
pub mod store;
pub mod token;

pub use manager::SessionManager;
pub use middleware::LoadAndSave;
pub use state::{Session, SessionStatus};
pub use store::{MemoryStore, SessionData, SessionRecord, SessionStore, SessionStoreError};

/// Session key holding the logged-in user's ID.
pub const AUTHENTICATED_USER_ID: &str = "authenticatedUserID";

/// Session key holding a one-time message for the next page.
pub const FLASH: &str = "flash";

/// Session key holding where to go after logging in.
pub const REDIRECT_AFTER_LOGIN: &str = "redirectPathAfterLogin";
