//! Listener binding.
//!
//! # Responsibilities
//! - Resolve the configured address (`:4000` means all interfaces)
//! - Bind the TCP listener
//! - Report bind failures with the offending address

use std::net::SocketAddr;

use tokio::net::TcpListener;

#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error("invalid listen address {address:?}: {source}")]
    Address {
        address: String,
        source: std::net::AddrParseError,
    },

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: SocketAddr,
        source: std::io::Error,
    },
}

/// Parse a listen address, accepting the `:port` shorthand.
pub fn parse_address(address: &str) -> Result<SocketAddr, ListenerError> {
    let full = if address.starts_with(':') {
        format!("0.0.0.0{}", address)
    } else {
        address.to_string()
    };
    full.parse().map_err(|source| ListenerError::Address {
        address: address.to_string(),
        source,
    })
}

pub async fn bind(address: SocketAddr) -> Result<TcpListener, ListenerError> {
    TcpListener::bind(address)
        .await
        .map_err(|source| ListenerError::Bind { address, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address() {
        assert_eq!(parse_address(":4000").unwrap(), "0.0.0.0:4000".parse().unwrap());
        assert_eq!(parse_address("127.0.0.1:8080").unwrap().port(), 8080);
        assert!(matches!(parse_address("nope"), Err(ListenerError::Address { .. })));
    }

    #[tokio::test]
    async fn test_bind_ephemeral() {
        let listener = bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), 0);
    }
}
