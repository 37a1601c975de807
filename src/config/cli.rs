//! Command-line surface.
//!
//! Flags override values from the optional config file; the merged result
//! is validated once.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::config::loader::{read_config, ConfigError};
use crate::config::schema::{AppConfig, TlsConfig};
use crate::config::validation::{validate_config, ValidationError};

#[derive(Parser, Debug, Default)]
#[command(name = "snippetbox")]
#[command(about = "Share short-lived text snippets", long_about = None)]
pub struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long, env = "SNIPPETBOX_CONFIG")]
    pub config: Option<PathBuf>,

    /// HTTP network address, e.g. ":4000" or "127.0.0.1:4000".
    #[arg(long)]
    pub addr: Option<String>,

    /// TLS certificate (PEM). Requires --tls-key.
    #[arg(long)]
    pub tls_cert: Option<PathBuf>,

    /// TLS private key (PEM). Requires --tls-cert.
    #[arg(long)]
    pub tls_key: Option<PathBuf>,

    /// Session lifetime, e.g. "12h" or "45m".
    #[arg(long, value_parser = humantime::parse_duration)]
    pub session_lifetime: Option<Duration>,
}

impl Cli {
    /// Resolve the effective configuration.
    pub fn into_config(self) -> Result<AppConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => AppConfig::default(),
        };

        if let Some(addr) = self.addr {
            // Accept the ":4000" shorthand for "all interfaces".
            config.listener.address = if addr.starts_with(':') {
                format!("0.0.0.0{}", addr)
            } else {
                addr
            };
        }

        match (self.tls_cert, self.tls_key) {
            (Some(cert_path), Some(key_path)) => {
                config.listener.tls = Some(TlsConfig { cert_path, key_path });
            }
            (None, None) => {}
            (cert, _) => {
                let field = if cert.is_some() { "--tls-key" } else { "--tls-cert" };
                return Err(ConfigError::Validation(vec![ValidationError {
                    field,
                    message: "TLS needs both a certificate and a key".to_string(),
                }]));
            }
        }

        if let Some(lifetime) = self.session_lifetime {
            config.session.lifetime = lifetime;
        }

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}
