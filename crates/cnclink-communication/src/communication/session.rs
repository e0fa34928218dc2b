//! Device sessions
//!
//! A [`DeviceSession`] binds one device id to one [`LineTransport`]. Its
//! [`SessionLink`] receives the transport's events, keeps the cached
//! connected flag and the latest telemetry, and forwards deduplicated
//! events to a [`SessionListener`].

use crate::communication::outbound::OutboundQueue;
use crate::communication::transport::{LineTransport, TransportListener};
use crate::firmware::StatusParser;
use cnclink_core::{ConnectionEndpoint, ConnectionError, PositionVector, Telemetry, TransportConfig};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Receiver of session events
///
/// Runs on the session's transport threads.
pub trait SessionListener: Send + Sync {
    /// The link came up; fired once per up-edge
    fn on_connected(&self, _link: &SessionLink) {}

    /// The link went down; fired once per down-edge
    fn on_disconnected(&self, _link: &SessionLink) {}

    /// Every inbound line, before any parsing
    fn on_line(&self, _link: &SessionLink, _line: &str) {}

    /// A status report updated the stored positions
    fn on_telemetry(&self, _link: &SessionLink, _telemetry: &Telemetry) {}
}

/// Per-device state shared between a session and its transport
pub struct SessionLink {
    device_id: String,
    session_id: Uuid,
    endpoint: ConnectionEndpoint,
    connected: AtomicBool,
    telemetry: Mutex<Telemetry>,
    outbound: Arc<OutboundQueue>,
    listener: Arc<dyn SessionListener>,
}

impl SessionLink {
    fn new(
        device_id: String,
        endpoint: ConnectionEndpoint,
        outbound: Arc<OutboundQueue>,
        listener: Arc<dyn SessionListener>,
    ) -> Self {
        Self {
            device_id,
            session_id: Uuid::new_v4(),
            endpoint,
            connected: AtomicBool::new(false),
            telemetry: Mutex::new(Telemetry::default()),
            outbound,
            listener,
        }
    }

    /// Device id this link belongs to
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Unique id of this session instance
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Remote endpoint
    pub fn endpoint(&self) -> &ConnectionEndpoint {
        &self.endpoint
    }

    /// Cached connected flag
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Queue a command on this device's transport
    pub fn send_command(&self, command: &str) -> bool {
        self.outbound.push(command)
    }

    /// Last reported machine position
    pub fn machine_position(&self) -> PositionVector {
        self.telemetry.lock().machine.clone()
    }

    /// Last reported work position
    pub fn work_position(&self) -> PositionVector {
        self.telemetry.lock().work.clone()
    }

    /// Wait for `delay` unless the session is stopped first
    ///
    /// Returns true if the full delay elapsed with the session still
    /// running. Listeners use it instead of sleeping on a transport thread.
    pub fn hold(&self, delay: Duration) -> bool {
        !self.outbound.wait_closed(delay)
    }

    /// Clear the connected flag; true if it was set
    pub(crate) fn mark_disconnected(&self) -> bool {
        self.connected.swap(false, Ordering::SeqCst)
    }
}

impl TransportListener for SessionLink {
    fn on_connected(&self) {
        if self
            .connected
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            tracing::info!(device = %self.device_id, "Session connected to {}", self.endpoint);
            self.listener.on_connected(self);
        } else {
            tracing::debug!(device = %self.device_id, "Duplicate connect notification ignored");
        }
    }

    fn on_disconnected(&self) {
        if self
            .connected
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            tracing::warn!(device = %self.device_id, "Session lost {}", self.endpoint);
            self.listener.on_disconnected(self);
        } else {
            tracing::debug!(device = %self.device_id, "Duplicate disconnect notification ignored");
        }
    }

    fn on_line(&self, line: &str) {
        self.listener.on_line(self, line);

        let Some(frame) = StatusParser::parse(line) else {
            return;
        };
        if !frame.has_position() {
            return;
        }

        let snapshot = {
            let mut telemetry = self.telemetry.lock();
            frame.apply_to(&mut telemetry);
            telemetry.clone()
        };
        self.listener.on_telemetry(self, &snapshot);
    }
}

/// One device id bound to one transport
pub struct DeviceSession {
    link: Arc<SessionLink>,
    transport: LineTransport,
}

impl DeviceSession {
    /// Build a stopped session
    pub fn new(
        device_id: impl Into<String>,
        endpoint: ConnectionEndpoint,
        config: TransportConfig,
        listener: Arc<dyn SessionListener>,
    ) -> Self {
        let outbound = Arc::new(OutboundQueue::new());
        let link = Arc::new(SessionLink::new(
            device_id.into(),
            endpoint.clone(),
            outbound.clone(),
            listener,
        ));
        let transport = LineTransport::with_outbound(endpoint, config, link.clone(), outbound);
        Self { link, transport }
    }

    /// Start the transport; at most once per session
    pub fn start(&self) -> Result<(), ConnectionError> {
        self.transport.start()
    }

    /// Stop the transport and wait for its threads
    pub fn stop(&self) {
        self.transport.stop();
    }

    /// Queue a command
    pub fn send(&self, command: &str) -> bool {
        self.link.send_command(command)
    }

    /// True when both the cached flag and the socket say connected
    pub fn is_connected(&self) -> bool {
        self.link.is_connected() && self.transport.is_connected()
    }

    /// Shared per-device state
    pub fn link(&self) -> &Arc<SessionLink> {
        &self.link
    }

    pub fn device_id(&self) -> &str {
        self.link.device_id()
    }

    pub fn endpoint(&self) -> &ConnectionEndpoint {
        self.link.endpoint()
    }

    pub fn machine_position(&self) -> PositionVector {
        self.link.machine_position()
    }

    pub fn work_position(&self) -> PositionVector {
        self.link.work_position()
    }
}
