//! Data models shared across the link
//!
//! Provides the endpoint, connection state and position types used by the
//! transport, the device sessions and the connection manager.

pub mod position;

pub use position::{PositionVector, Telemetry};

use crate::error::ConnectionError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Remote controller address
///
/// Immutable once a session is built from it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionEndpoint {
    host: String,
    port: u16,
}

impl ConnectionEndpoint {
    /// Create an endpoint, rejecting an empty host or port 0
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self, ConnectionError> {
        let host = host.into().trim().to_string();
        if host.is_empty() {
            return Err(ConnectionError::invalid_parameters("host must not be empty"));
        }
        if port == 0 {
            return Err(ConnectionError::invalid_parameters(
                "port must be in the range 1-65535",
            ));
        }
        Ok(Self { host, port })
    }

    /// Host name or dotted-quad address
    pub fn host(&self) -> &str {
        &self.host
    }

    /// TCP port
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for ConnectionEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Link state of a transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    /// No socket
    #[default]
    Disconnected,
    /// A connection sequence is running
    Connecting,
    /// Socket handshake completed
    Connected,
}

impl ConnectionState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Connecting,
            2 => Self::Connected,
            _ => Self::Disconnected,
        }
    }

    pub(crate) fn as_u8(self) -> u8 {
        match self {
            Self::Disconnected => 0,
            Self::Connecting => 1,
            Self::Connected => 2,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
        }
    }
}

/// Lock-free cell holding a [`ConnectionState`]
#[derive(Debug, Default)]
pub struct AtomicConnectionState(std::sync::atomic::AtomicU8);

impl AtomicConnectionState {
    /// Create a cell holding `state`
    pub fn new(state: ConnectionState) -> Self {
        Self(std::sync::atomic::AtomicU8::new(state.as_u8()))
    }

    /// Current state
    pub fn load(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.load(std::sync::atomic::Ordering::SeqCst))
    }

    /// Replace the state
    pub fn store(&self, state: ConnectionState) {
        self.0
            .store(state.as_u8(), std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_validation() {
        let endpoint = ConnectionEndpoint::new(" 192.168.1.20 ", 23).unwrap();
        assert_eq!(endpoint.host(), "192.168.1.20");
        assert_eq!(endpoint.to_string(), "192.168.1.20:23");

        assert!(ConnectionEndpoint::new("", 23).is_err());
        assert!(matches!(
            ConnectionEndpoint::new("fluidnc.local", 0),
            Err(ConnectionError::InvalidParameters { .. })
        ));
    }

    #[test]
    fn test_atomic_state_roundtrip() {
        let cell = AtomicConnectionState::default();
        assert_eq!(cell.load(), ConnectionState::Disconnected);
        cell.store(ConnectionState::Connecting);
        assert_eq!(cell.load(), ConnectionState::Connecting);
        cell.store(ConnectionState::Connected);
        assert_eq!(cell.load().to_string(), "Connected");
    }
}
