//! Request-level error taxonomy.
//!
//! Handlers and interceptors return typed failures; the route adapter turns
//! them into responses at the boundary so internal causes never reach the
//! client.

use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};

use crate::models::ModelError;
use crate::session::SessionStoreError;
use crate::templates::RenderError;

/// Failure raised while serving a single request.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The request itself was wrong (bad form, CSRF mismatch, ...).
    #[error("client error: {0}")]
    ClientError(StatusCode),

    /// Unknown route or missing entity.
    #[error("not found")]
    NotFound,

    /// Unexpected collaborator failure.
    #[error("server fault: {0:#}")]
    ServerFault(#[from] anyhow::Error),
}

impl AppError {
    /// Convert into a response, logging server faults with request context.
    pub fn into_response_for(self, method: &Method, uri: &Uri) -> Response {
        match self {
            AppError::ClientError(status) => {
                tracing::debug!(method = %method, uri = %uri, status = status.as_u16(), "client error");
                status_response(status)
            }
            AppError::NotFound => status_response(StatusCode::NOT_FOUND),
            AppError::ServerFault(err) => {
                tracing::error!(method = %method, uri = %uri, error = %format!("{err:#}"), "server fault");
                status_response(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

impl From<ModelError> for AppError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::NoRecord => AppError::NotFound,
            other => AppError::ServerFault(other.into()),
        }
    }
}

impl From<RenderError> for AppError {
    fn from(err: RenderError) -> Self {
        AppError::ServerFault(err.into())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::ServerFault(err.into())
    }
}

impl From<SessionStoreError> for AppError {
    fn from(err: SessionStoreError) -> Self {
        AppError::ServerFault(err.into())
    }
}

/// Plain-text response with the canonical reason phrase as body.
pub fn status_response(status: StatusCode) -> Response {
    let reason = status.canonical_reason().unwrap_or("Unknown Status");
    (status, reason.to_string()).into_response()
}
