//! Data collaborators.
//!
//! Handlers only see the traits; the in-memory implementations back the
//! binary and the tests. A database backend would slot in behind the same
//! traits.

pub mod snippets;
pub mod users;

pub use snippets::{MemorySnippetStore, Snippet, SnippetId, SnippetStore};
pub use users::{MemoryUserStore, User, UserId, UserStore};

/// Failures a model call can report.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("no matching record found")]
    NoRecord,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("duplicate email")]
    DuplicateEmail,

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}
