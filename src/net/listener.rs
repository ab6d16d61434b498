//! TCP listener binding.
//!
//! # Responsibilities
//! - Parse and bind the configured address
//! - Fail fast with a diagnostic naming the address
//!
//! # Design Decisions
//! - No retry: a busy port is a startup failure

use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::ListenerConfig;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Configured address does not parse.
    #[error("invalid bind address '{address}': {source}")]
    Address {
        address: String,
        #[source]
        source: std::net::AddrParseError,
    },

    /// Failed to bind to address.
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Bind a TCP listener on the configured address.
///
/// Returns the listener together with the address actually bound, which
/// differs from the configured one when port 0 was requested.
pub async fn bind(config: &ListenerConfig) -> Result<(TcpListener, SocketAddr), ListenerError> {
    let address: SocketAddr =
        config
            .bind_address
            .parse()
            .map_err(|source| ListenerError::Address {
                address: config.bind_address.clone(),
                source,
            })?;

    let listener = TcpListener::bind(address)
        .await
        .map_err(|source| ListenerError::Bind { address, source })?;

    let local_addr = listener
        .local_addr()
        .map_err(|source| ListenerError::Bind { address, source })?;

    tracing::info!(address = %local_addr, "Listener bound");

    Ok((listener, local_addr))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(address: &str) -> ListenerConfig {
        ListenerConfig {
            bind_address: address.to_string(),
            ..ListenerConfig::default()
        }
    }

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let (listener, local_addr) = bind(&config("127.0.0.1:0")).await.unwrap();
        assert_ne!(local_addr.port(), 0);
        assert_eq!(listener.local_addr().unwrap(), local_addr);
    }

    #[tokio::test]
    async fn test_bind_busy_port_fails() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = taken.local_addr().unwrap();

        let err = bind(&config(&addr.to_string())).await.unwrap_err();
        assert!(matches!(err, ListenerError::Bind { address, .. } if address == addr));
        assert!(err.to_string().contains(&addr.to_string()));
    }

    #[tokio::test]
    async fn test_bind_invalid_address() {
        let err = bind(&config("localhost")).await.unwrap_err();
        assert!(matches!(err, ListenerError::Address { .. }));
    }
}
