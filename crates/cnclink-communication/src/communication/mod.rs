//! TCP communication with FluidNC/GRBL controllers
//!
//! Layers, bottom up:
//!
//! - [`framer`]: splits the inbound byte stream into lines
//! - [`outbound`]: pending-command queue with retry-at-head
//! - [`transport`]: one auto-reconnecting socket with rx/tx threads
//! - [`session`]: one device id bound to one transport, plus telemetry
//! - [`manager`]: registry of sessions and the application callbacks

pub mod framer;
pub mod manager;
pub mod outbound;
pub mod session;
pub mod transport;

pub use framer::LineFramer;
pub use manager::{
    CommandSentCallback, CommunicationManager, ConnectionStatusCallback, ManagerCallbacks,
    MessageCallback, ResponseCallback, TelemetryCallback,
};
pub use outbound::OutboundQueue;
pub use session::{DeviceSession, SessionLink, SessionListener};
pub use transport::{resolve_ipv4, LineTransport, TransportListener, LINE_TERMINATOR};
