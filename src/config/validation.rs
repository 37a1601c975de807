//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (lifetimes > 0, addresses parse)
//! - Detect half-configured features (TLS cert without key)
//!
//! Returns all validation errors, not just the first.

use std::net::SocketAddr;

use crate::config::schema::{AppConfig, MAX_SESSION_LIFETIME};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(e) = config.listener.address.parse::<SocketAddr>() {
        errors.push(ValidationError::new(
            "listener.address",
            format!("'{}' is not a socket address: {}", config.listener.address, e),
        ));
    }

    if let Some(tls) = &config.listener.tls {
        if tls.cert_path.as_os_str().is_empty() {
            errors.push(ValidationError::new("listener.tls.cert_path", "must not be empty"));
        }
        if tls.key_path.as_os_str().is_empty() {
            errors.push(ValidationError::new("listener.tls.key_path", "must not be empty"));
        }
    }

    if config.session.lifetime.is_zero() {
        errors.push(ValidationError::new("session.lifetime", "must be greater than zero"));
    } else if config.session.lifetime > MAX_SESSION_LIFETIME {
        errors.push(ValidationError::new(
            "session.lifetime",
            format!(
                "must be at most {}",
                humantime::format_duration(MAX_SESSION_LIFETIME)
            ),
        ));
    }
    if config.session.cleanup_interval.is_zero() {
        errors.push(ValidationError::new(
            "session.cleanup_interval",
            "must be greater than zero",
        ));
    }
    let name = &config.session.cookie_name;
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        errors.push(ValidationError::new(
            "session.cookie_name",
            "must be a non-empty token of letters, digits, '_' or '-'",
        ));
    }

    if config.http.max_body_size == 0 {
        errors.push(ValidationError::new("http.max_body_size", "must be greater than zero"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
