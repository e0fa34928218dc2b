//! Error handling for CncLink
//!
//! Provides the error types shared by every layer of the link:
//! - Connection errors (endpoint validation, resolution, socket and thread setup)
//! - A unified [`Error`] wrapping them together with I/O failures
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Connection error type
///
/// Represents errors related to establishing or using a link to a
/// CNC controller over TCP.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// Invalid connection parameters
    #[error("Invalid connection parameters: {reason}")]
    InvalidParameters {
        /// The reason the parameters are invalid.
        reason: String,
    },

    /// Failed to resolve hostname to an IPv4 address
    #[error("Failed to resolve hostname {hostname}")]
    HostnameResolution {
        /// The hostname that failed to resolve.
        hostname: String,
    },

    /// TCP connect attempt failed
    #[error("Failed to connect to {host}:{port}: {reason}")]
    ConnectFailed {
        /// Remote host.
        host: String,
        /// Remote port.
        port: u16,
        /// The reason reported by the socket layer.
        reason: String,
    },

    /// Worker thread could not be created
    #[error("Failed to spawn {name} thread: {reason}")]
    ThreadSpawn {
        /// Thread name.
        name: String,
        /// The reason reported by the OS.
        reason: String,
    },

    /// Link is not connected
    #[error("Device {device_id} is not connected")]
    NotConnected {
        /// The device identifier.
        device_id: String,
    },

    /// No session is registered for the device
    #[error("Unknown device: {device_id}")]
    UnknownDevice {
        /// The device identifier.
        device_id: String,
    },

    /// Generic connection error
    #[error("Connection error: {message}")]
    Other {
        /// The error message.
        message: String,
    },
}

impl ConnectionError {
    /// Shorthand for [`ConnectionError::InvalidParameters`]
    pub fn invalid_parameters(reason: impl Into<String>) -> Self {
        Self::InvalidParameters {
            reason: reason.into(),
        }
    }
}

/// Main error type for CncLink
///
/// A unified error type that can represent any error from all layers.
/// This is the primary error type used in public APIs.
#[derive(Error, Debug)]
pub enum Error {
    /// Connection error
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a connection error
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Error::Connection(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
