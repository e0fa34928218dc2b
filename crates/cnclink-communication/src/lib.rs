//! # CncLink Communication
//!
//! Talks to FluidNC/GRBL-style controllers over raw TCP (telnet-style port
//! 23). Provides the auto-reconnecting line transport, status report
//! parsing, per-device sessions and the connection manager that applications
//! drive.

pub mod communication;
pub mod firmware;

pub use communication::{
    CommandSentCallback, CommunicationManager, ConnectionStatusCallback, DeviceSession,
    LineFramer, LineTransport, ManagerCallbacks, MessageCallback, OutboundQueue,
    ResponseCallback, SessionLink, SessionListener, TelemetryCallback, TransportListener,
};

pub use firmware::{StatusFrame, StatusParser};
