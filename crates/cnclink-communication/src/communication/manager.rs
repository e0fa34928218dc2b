//! Connection manager
//!
//! Keeps a registry of [`DeviceSession`]s keyed by device id and turns their
//! events into application callbacks.
//!
//! Connection edges, command echoes and user messages are posted to the
//! [`UiQueue`]. Raw responses and telemetry are delivered straight from the
//! transport thread, so those callbacks must be thread-safe and quick.
//!
//! Sessions are stopped only after they leave the registry and its lock is
//! released, so callbacks on a transport thread may call back into the
//! manager. While an id is being stopped, `connect_machine` for that id
//! waits; a callback must not reconnect its own device for that reason.

use crate::communication::session::{DeviceSession, SessionLink, SessionListener};
use cnclink_core::{
    thread_safe_rw, ConnectionEndpoint, ErrorReporter, MessageLevel, PositionVector, Result,
    Telemetry, ThreadSafeRw, TransportConfig, UiQueue,
};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};

/// `(device_id, text, level)`
pub type MessageCallback = Arc<dyn Fn(&str, &str, MessageLevel) + Send + Sync>;
/// `(device_id, command)`
pub type CommandSentCallback = Arc<dyn Fn(&str, &str) + Send + Sync>;
/// `(device_id, line)`
pub type ResponseCallback = Arc<dyn Fn(&str, &str) + Send + Sync>;
/// `(device_id, connected)`
pub type ConnectionStatusCallback = Arc<dyn Fn(&str, bool) + Send + Sync>;
/// `(device_id, machine_position, work_position)`
pub type TelemetryCallback = Arc<dyn Fn(&str, &PositionVector, &PositionVector) + Send + Sync>;

/// Application callbacks; every slot is optional
#[derive(Clone, Default)]
pub struct ManagerCallbacks {
    pub message: Option<MessageCallback>,
    pub command_sent: Option<CommandSentCallback>,
    pub response: Option<ResponseCallback>,
    pub connection_status: Option<ConnectionStatusCallback>,
    pub telemetry: Option<TelemetryCallback>,
}

impl ManagerCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// User-facing messages (UI queue)
    pub fn on_message<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &str, MessageLevel) + Send + Sync + 'static,
    {
        self.message = Some(Arc::new(f));
        self
    }

    /// Echo of every accepted command (UI queue)
    pub fn on_command_sent<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &str) + Send + Sync + 'static,
    {
        self.command_sent = Some(Arc::new(f));
        self
    }

    /// Every inbound line (transport thread)
    pub fn on_response<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &str) + Send + Sync + 'static,
    {
        self.response = Some(Arc::new(f));
        self
    }

    /// Connection up/down edges (UI queue)
    pub fn on_connection_status<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, bool) + Send + Sync + 'static,
    {
        self.connection_status = Some(Arc::new(f));
        self
    }

    /// Position updates from status reports (transport thread)
    pub fn on_telemetry<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &PositionVector, &PositionVector) + Send + Sync + 'static,
    {
        self.telemetry = Some(Arc::new(f));
        self
    }
}

impl std::fmt::Debug for ManagerCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagerCallbacks")
            .field("message", &self.message.is_some())
            .field("command_sent", &self.command_sent.is_some())
            .field("response", &self.response.is_some())
            .field("connection_status", &self.connection_status.is_some())
            .field("telemetry", &self.telemetry.is_some())
            .finish()
    }
}

#[derive(Default)]
struct Registry {
    sessions: HashMap<String, DeviceSession>,
    /// Ids whose previous session is still shutting down
    stopping: HashSet<String>,
}

impl Registry {
    /// Take a session out and mark its id as stopping
    fn detach(&mut self, device_id: &str) -> Option<DeviceSession> {
        let session = self.sessions.remove(device_id)?;
        self.stopping.insert(device_id.to_string());
        Some(session)
    }
}

struct ManagerInner {
    registry: Mutex<Registry>,
    released: Condvar,
    callbacks: ThreadSafeRw<ManagerCallbacks>,
    ui_queue: Arc<dyn UiQueue>,
    reporter: Arc<dyn ErrorReporter>,
    config: TransportConfig,
}

impl ManagerInner {
    fn post_message(&self, device_id: &str, text: String, level: MessageLevel) {
        let Some(callback) = self.callbacks.read().message.clone() else {
            return;
        };
        let device_id = device_id.to_string();
        self.ui_queue
            .post(Box::new(move || callback(&device_id, &text, level)));
    }

    fn post_command_sent(&self, device_id: &str, command: &str) {
        let Some(callback) = self.callbacks.read().command_sent.clone() else {
            return;
        };
        let device_id = device_id.to_string();
        let command = command.to_string();
        self.ui_queue
            .post(Box::new(move || callback(&device_id, &command)));
    }

    fn post_connection_status(&self, device_id: &str, connected: bool) {
        let Some(callback) = self.callbacks.read().connection_status.clone() else {
            return;
        };
        let device_id = device_id.to_string();
        self.ui_queue
            .post(Box::new(move || callback(&device_id, connected)));
    }

    fn announce_connected(&self, link: &SessionLink) {
        let query = self.config.status_query.as_str();
        self.post_command_sent(link.device_id(), query);
        link.send_command(query);
        self.post_connection_status(link.device_id(), true);
        self.post_message(
            link.device_id(),
            format!("Connected to machine: {}", link.device_id()),
            MessageLevel::Info,
        );
    }

    fn announce_disconnected(&self, device_id: &str) {
        self.post_connection_status(device_id, false);
        self.post_message(
            device_id,
            format!("Disconnected from machine: {}", device_id),
            MessageLevel::Warning,
        );
    }

    /// Stop a detached session and release its id
    ///
    /// Must run without the registry lock held.
    fn retire(&self, session: DeviceSession) {
        session.stop();
        if session.link().mark_disconnected() {
            self.announce_disconnected(session.device_id());
        }
        self.registry.lock().stopping.remove(session.device_id());
        self.released.notify_all();
    }
}

/// Routes session events into the manager without keeping it alive
struct SessionEvents {
    manager: Weak<ManagerInner>,
}

impl SessionListener for SessionEvents {
    fn on_connected(&self, link: &SessionLink) {
        let Some(manager) = self.manager.upgrade() else {
            return;
        };
        // give the controller a moment before the first query
        if !link.hold(manager.config.status_query_delay()) {
            // stopped before the edge was announced; keep it silent
            link.mark_disconnected();
            return;
        }
        manager.announce_connected(link);
    }

    fn on_disconnected(&self, link: &SessionLink) {
        if let Some(manager) = self.manager.upgrade() {
            manager.announce_disconnected(link.device_id());
        }
    }

    fn on_line(&self, link: &SessionLink, line: &str) {
        let Some(manager) = self.manager.upgrade() else {
            return;
        };
        let callback = manager.callbacks.read().response.clone();
        if let Some(callback) = callback {
            callback(link.device_id(), line);
        }
    }

    fn on_telemetry(&self, link: &SessionLink, telemetry: &Telemetry) {
        let Some(manager) = self.manager.upgrade() else {
            return;
        };
        let callback = manager.callbacks.read().telemetry.clone();
        if let Some(callback) = callback {
            callback(link.device_id(), &telemetry.machine, &telemetry.work);
        }
    }
}

fn connect_failure_details(host: &str, port: u16, cause: &dyn std::fmt::Display) -> String {
    format!(
        "Host: {}\nPort: {}\nError: {}\n\nPossible solutions:\n\
         - Check that the controller is powered on and reachable on the network\n\
         - Verify the host address and port number\n\
         - Make sure no other program is holding the connection",
        host, port, cause
    )
}

/// Registry of device sessions
///
/// Dropping the manager disconnects every device.
pub struct CommunicationManager {
    inner: Arc<ManagerInner>,
}

impl CommunicationManager {
    /// Create a manager with default transport timings
    pub fn new(ui_queue: Arc<dyn UiQueue>, reporter: Arc<dyn ErrorReporter>) -> Self {
        Self::with_config(ui_queue, reporter, TransportConfig::default())
    }

    /// Create a manager whose sessions use `config`
    pub fn with_config(
        ui_queue: Arc<dyn UiQueue>,
        reporter: Arc<dyn ErrorReporter>,
        config: TransportConfig,
    ) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                registry: Mutex::new(Registry::default()),
                released: Condvar::new(),
                callbacks: thread_safe_rw(ManagerCallbacks::default()),
                ui_queue,
                reporter,
                config,
            }),
        }
    }

    /// Install callbacks while building the manager
    pub fn with_callbacks(self, callbacks: ManagerCallbacks) -> Self {
        self.set_callbacks(callbacks);
        self
    }

    /// Replace all callbacks
    pub fn set_callbacks(&self, callbacks: ManagerCallbacks) {
        *self.inner.callbacks.write() = callbacks;
    }

    /// Transport settings used for new sessions
    pub fn config(&self) -> &TransportConfig {
        &self.inner.config
    }

    /// Start a session for `device_id`
    ///
    /// Returns once the transport threads are running; the socket connects
    /// asynchronously and the connection-status callback reports the edge.
    /// Connecting an already connected device only warns. A previous
    /// session that never came up is stopped and replaced, and a session
    /// still being disconnected is waited for, so an id never owns two
    /// sockets.
    pub fn connect_machine(&self, device_id: &str, host: &str, port: u16) -> Result<()> {
        let mut registry = self.inner.registry.lock();

        loop {
            while registry.stopping.contains(device_id) {
                self.inner.released.wait(&mut registry);
            }

            let existing = registry
                .sessions
                .get(device_id)
                .map(|session| (session.is_connected(), session.endpoint().to_string()));
            match existing {
                Some((true, endpoint)) => {
                    tracing::warn!("Machine {} is already connected", device_id);
                    self.inner.reporter.report_warning(
                        "Already Connected",
                        &format!("Machine {} is already connected", device_id),
                        &format!("Endpoint: {}", endpoint),
                    );
                    return Ok(());
                }
                Some((false, _)) => {
                    tracing::info!("Replacing pending session for {}", device_id);
                    if let Some(stale) = registry.detach(device_id) {
                        MutexGuard::unlocked(&mut registry, || self.inner.retire(stale));
                    }
                }
                None => break,
            }
        }

        let started: Result<DeviceSession> = ConnectionEndpoint::new(host, port)
            .map_err(Into::into)
            .and_then(|endpoint| {
                let session = DeviceSession::new(
                    device_id,
                    endpoint,
                    self.inner.config.clone(),
                    Arc::new(SessionEvents {
                        manager: Arc::downgrade(&self.inner),
                    }),
                );
                session.start()?;
                Ok(session)
            });

        match started {
            Ok(session) => {
                tracing::info!(
                    "Connecting machine {} at {} (session {})",
                    device_id,
                    session.endpoint(),
                    session.link().session_id()
                );
                registry.sessions.insert(device_id.to_string(), session);
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to start connection to {}: {}", device_id, e);
                self.inner.reporter.report_error(
                    "Connection Error",
                    &format!("Failed to start connection to {}", device_id),
                    &connect_failure_details(host, port, &e),
                );
                Err(e)
            }
        }
    }

    /// Stop and remove the session for `device_id`
    ///
    /// Returns false if no session exists. A connected session produces one
    /// disconnected status edge.
    pub fn disconnect_machine(&self, device_id: &str) -> bool {
        let detached = self.inner.registry.lock().detach(device_id);
        match detached {
            Some(session) => {
                tracing::info!("Disconnecting machine {}", device_id);
                self.inner.retire(session);
                true
            }
            None => {
                tracing::warn!("Cannot disconnect unknown machine {}", device_id);
                false
            }
        }
    }

    /// True if a session exists and its link is up
    pub fn is_connected(&self, device_id: &str) -> bool {
        self.inner
            .registry
            .lock()
            .sessions
            .get(device_id)
            .is_some_and(DeviceSession::is_connected)
    }

    /// Queue a command for a connected device
    ///
    /// A device that is unknown or down, or a command that is empty or
    /// spans several lines, gets an error message instead and no
    /// command-sent echo.
    pub fn send_command(&self, device_id: &str, command: &str) -> bool {
        let registry = self.inner.registry.lock();
        match registry.sessions.get(device_id) {
            Some(session) if session.is_connected() => {
                if !session.send(command) {
                    tracing::warn!("Refusing to send {:?} to {}", command, device_id);
                    self.inner.post_message(
                        device_id,
                        "Cannot send command - empty or multi-line command".to_string(),
                        MessageLevel::Error,
                    );
                    return false;
                }
                self.inner.post_command_sent(device_id, command);
                tracing::debug!("Queued '{}' for {}", command, device_id);
                true
            }
            _ => {
                tracing::error!("Cannot send '{}' to {}: not connected", command, device_id);
                self.inner.post_message(
                    device_id,
                    "Cannot send command - machine not connected".to_string(),
                    MessageLevel::Error,
                );
                false
            }
        }
    }

    /// Last machine position, or the zero vector if not connected
    pub fn machine_position(&self, device_id: &str) -> PositionVector {
        self.inner
            .registry
            .lock()
            .sessions
            .get(device_id)
            .filter(|session| session.is_connected())
            .map(DeviceSession::machine_position)
            .unwrap_or_default()
    }

    /// Last work position, or the zero vector if not connected
    pub fn work_position(&self, device_id: &str) -> PositionVector {
        self.inner
            .registry
            .lock()
            .sessions
            .get(device_id)
            .filter(|session| session.is_connected())
            .map(DeviceSession::work_position)
            .unwrap_or_default()
    }

    /// Stop every session and empty the registry
    pub fn disconnect_all(&self) {
        let detached: Vec<DeviceSession> = {
            let mut registry = self.inner.registry.lock();
            let ids: Vec<String> = registry.sessions.keys().cloned().collect();
            ids.iter().filter_map(|id| registry.detach(id)).collect()
        };
        if detached.is_empty() {
            return;
        }
        tracing::info!("Disconnecting {} machine(s)", detached.len());
        for session in detached {
            self.inner.retire(session);
        }
    }

    /// Ids of devices whose link is up, sorted
    pub fn connected_devices(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .inner
            .registry
            .lock()
            .sessions
            .iter()
            .filter(|(_, session)| session.is_connected())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Number of registered sessions, connected or not
    pub fn session_count(&self) -> usize {
        self.inner.registry.lock().sessions.len()
    }
}

impl Drop for CommunicationManager {
    fn drop(&mut self) {
        self.disconnect_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cnclink_core::{ChannelUiQueue, ConnectionError, Error, MemoryErrorReporter};

    fn manager() -> (CommunicationManager, cnclink_core::UiQueueReceiver, MemoryErrorReporter) {
        let (queue, receiver) = ChannelUiQueue::new();
        let reporter = MemoryErrorReporter::new();
        let manager = CommunicationManager::new(Arc::new(queue), Arc::new(reporter.clone()));
        (manager, receiver, reporter)
    }

    #[test]
    fn test_invalid_endpoint_is_reported_and_not_registered() {
        let (manager, _receiver, reporter) = manager();

        let result = manager.connect_machine("m1", "", 23);
        assert!(matches!(
            result,
            Err(Error::Connection(ConnectionError::InvalidParameters { .. }))
        ));
        assert_eq!(manager.session_count(), 0);

        let errors = reporter.reports_at(MessageLevel::Error);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].title, "Connection Error");
        assert!(errors[0].details.contains("Port: 23"));
        assert!(errors[0].details.contains("Possible solutions"));
    }

    #[test]
    fn test_unknown_device_queries() {
        let (manager, _receiver, _reporter) = manager();
        assert!(!manager.is_connected("ghost"));
        assert!(!manager.disconnect_machine("ghost"));
        assert_eq!(manager.machine_position("ghost"), PositionVector::zero());
        assert_eq!(manager.work_position("ghost"), PositionVector::zero());
        assert!(manager.connected_devices().is_empty());
    }

    #[test]
    fn test_disconnect_releases_stopping_marker() {
        let (manager, _receiver, _reporter) = manager();
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();

        manager.connect_machine("m1", "127.0.0.1", port).unwrap();
        manager.connect_machine("m1", "127.0.0.1", port).unwrap();
        assert!(manager.disconnect_machine("m1"));

        let registry = manager.inner.registry.lock();
        assert!(registry.sessions.is_empty());
        assert!(registry.stopping.is_empty());
    }

    #[test]
    fn test_callbacks_debug_shows_installed_slots() {
        let callbacks = ManagerCallbacks::new().on_response(|_, _| {});
        let text = format!("{:?}", callbacks);
        assert!(text.contains("response: true"));
        assert!(text.contains("telemetry: false"));
    }
}
