//! Non-blocking TCP listener.
//!
//! # Responsibilities
//! - Bind to the configured port
//! - Register for ACCEPT readiness with the reactor's poll
//! - Hand out accepted streams (already non-blocking)

use std::net::SocketAddr;

use mio::net::{TcpListener, TcpStream};
use mio::{Interest, Registry, Token};

use crate::config::ListenerConfig;

/// Error type for listener operations.
#[derive(Debug)]
pub enum ListenerError {
    /// Failed to bind to address.
    Bind(std::io::Error),
    /// Failed to set up readiness polling.
    Poll(std::io::Error),
}

impl std::fmt::Display for ListenerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerError::Bind(e) => write!(f, "Failed to bind: {}", e),
            ListenerError::Poll(e) => write!(f, "Failed to poll: {}", e),
        }
    }
}

impl std::error::Error for ListenerError {}

/// The listening socket owned by the reactor.
pub struct Listener {
    /// The underlying TCP listener.
    inner: TcpListener,
    /// Address actually bound (resolves port 0).
    local_addr: SocketAddr,
}

impl Listener {
    /// Bind to the configured port on all interfaces.
    pub fn bind(config: &ListenerConfig) -> Result<Self, ListenerError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

        let inner = TcpListener::bind(addr).map_err(ListenerError::Bind)?;
        let local_addr = inner.local_addr().map_err(ListenerError::Bind)?;

        tracing::info!(
            address = %local_addr,
            buffer_capacity = config.buffer_capacity,
            "Listener bound"
        );

        Ok(Self { inner, local_addr })
    }

    /// Register for ACCEPT readiness under `token`.
    pub fn register(&mut self, registry: &Registry, token: Token) -> Result<(), ListenerError> {
        registry
            .register(&mut self.inner, token, Interest::READABLE)
            .map_err(ListenerError::Poll)
    }

    pub fn deregister(&mut self, registry: &Registry) {
        if let Err(e) = registry.deregister(&mut self.inner) {
            tracing::debug!(error = %e, "Listener deregistration failed");
        }
    }

    /// Accept one pending connection.
    pub fn accept(&self) -> std::io::Result<(TcpStream, SocketAddr)> {
        self.inner.accept()
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}
