//! TCP line transport
//!
//! Owns one socket to one controller endpoint and runs two OS threads:
//!
//! - the receive loop connects (and reconnects), reads the byte stream and
//!   hands complete lines to the [`TransportListener`];
//! - the transmit loop drains the [`OutboundQueue`], writing each command
//!   followed by CR LF.
//!
//! I/O failures never escape the loops. They turn into state transitions,
//! a disconnect notification and, while auto-reconnect is on, a new
//! connection sequence.

use crate::communication::framer::LineFramer;
use crate::communication::outbound::OutboundQueue;
use cnclink_core::{
    AtomicConnectionState, ConnectionEndpoint, ConnectionError, ConnectionState, TransportConfig,
};
use parking_lot::{Condvar, Mutex};
use std::io::{self, Read, Write};
use std::net::{Ipv4Addr, Shutdown, SocketAddr, SocketAddrV4, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Terminator appended to every outbound command
pub const LINE_TERMINATOR: &str = "\r\n";

/// Receiver of transport events
///
/// Every method runs on one of the transport's own threads. Implementations
/// that need a particular thread must hand the work off themselves.
pub trait TransportListener: Send + Sync {
    /// The socket handshake completed
    fn on_connected(&self) {}

    /// An established link was lost
    fn on_disconnected(&self) {}

    /// A complete, non-empty inbound line arrived
    fn on_line(&self, _line: &str) {}
}

/// Resolve an endpoint to one IPv4 socket address
///
/// Dotted-quad hosts are used as-is; anything else goes through the system
/// resolver and the first IPv4 result wins.
pub fn resolve_ipv4(endpoint: &ConnectionEndpoint) -> Result<SocketAddr, ConnectionError> {
    if let Ok(ip) = endpoint.host().parse::<Ipv4Addr>() {
        return Ok(SocketAddr::V4(SocketAddrV4::new(ip, endpoint.port())));
    }

    let unresolved = || ConnectionError::HostnameResolution {
        hostname: endpoint.host().to_string(),
    };

    (endpoint.host(), endpoint.port())
        .to_socket_addrs()
        .map_err(|_| unresolved())?
        .find(SocketAddr::is_ipv4)
        .ok_or_else(unresolved)
}

/// State shared by the transport handle and its two threads
struct Shared {
    endpoint: ConnectionEndpoint,
    config: TransportConfig,
    listener: Arc<dyn TransportListener>,
    outbound: Arc<OutboundQueue>,
    running: AtomicBool,
    auto_reconnect: AtomicBool,
    state: AtomicConnectionState,
    /// Write half of the live socket; shutting it down unblocks the reader
    socket: Mutex<Option<TcpStream>>,
    sleep_lock: Mutex<()>,
    wake: Condvar,
}

impl Shared {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn auto_reconnect(&self) -> bool {
        self.auto_reconnect.load(Ordering::SeqCst)
    }

    /// Sleep for `delay` unless stopped first; returns whether still running
    fn pause(&self, delay: Duration) -> bool {
        let deadline = Instant::now() + delay;
        let mut guard = self.sleep_lock.lock();
        while self.is_running() {
            if self.wake.wait_until(&mut guard, deadline).timed_out() {
                break;
            }
        }
        self.is_running()
    }

    fn wake_sleepers(&self) {
        let _guard = self.sleep_lock.lock();
        self.wake.notify_all();
    }

    fn close_socket(&self) {
        if let Some(stream) = self.socket.lock().take() {
            tracing::debug!("Closing socket to {}", self.endpoint);
            let _ = stream.shutdown(Shutdown::Both);
        }
    }

    fn connect_once(&self) -> Result<TcpStream, ConnectionError> {
        let addr = resolve_ipv4(&self.endpoint)?;
        let stream =
            TcpStream::connect_timeout(&addr, self.config.connect_timeout()).map_err(|e| {
                ConnectionError::ConnectFailed {
                    host: self.endpoint.host().to_string(),
                    port: self.endpoint.port(),
                    reason: e.to_string(),
                }
            })?;

        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!("Failed to set TCP_NODELAY on {}: {}", self.endpoint, e);
        }
        if let Err(e) = stream.set_write_timeout(Some(self.config.connect_timeout())) {
            tracing::debug!("Failed to set write timeout on {}: {}", self.endpoint, e);
        }

        Ok(stream)
    }

    /// Try to connect, retrying while auto-reconnect is on
    fn connect_sequence(&self) -> Option<TcpStream> {
        self.state.store(ConnectionState::Connecting);
        tracing::info!("Connecting to {}", self.endpoint);

        while self.is_running() {
            match self.connect_once() {
                Ok(stream) => return Some(stream),
                Err(e) => {
                    tracing::debug!("Connection attempt to {} failed: {}", self.endpoint, e);
                    if !self.auto_reconnect() || !self.pause(self.config.connect_retry_delay()) {
                        break;
                    }
                }
            }
        }

        self.state.store(ConnectionState::Disconnected);
        None
    }

    /// Publish a freshly connected stream; returns the read half
    fn install(&self, stream: TcpStream) -> Option<TcpStream> {
        let writer = match stream.try_clone() {
            Ok(writer) => writer,
            Err(e) => {
                tracing::warn!("Failed to clone socket to {}: {}", self.endpoint, e);
                let _ = stream.shutdown(Shutdown::Both);
                self.state.store(ConnectionState::Disconnected);
                return None;
            }
        };
        *self.socket.lock() = Some(writer);

        // stop() may have run between connect and publish
        if !self.is_running() {
            self.close_socket();
            self.state.store(ConnectionState::Disconnected);
            return None;
        }

        self.state.store(ConnectionState::Connected);
        tracing::info!("Connected to {}", self.endpoint);
        self.listener.on_connected();
        Some(stream)
    }

    fn link_lost(&self, reason: &str) {
        self.state.store(ConnectionState::Disconnected);
        self.close_socket();
        if self.is_running() {
            tracing::warn!("Connection to {} lost: {}", self.endpoint, reason);
            self.listener.on_disconnected();
        }
    }

    fn receive_loop(&self) {
        tracing::debug!("Receive loop started for {}", self.endpoint);
        let mut framer = LineFramer::new();
        let mut buf = vec![0u8; self.config.read_buffer_size.max(1)];
        let mut reader: Option<TcpStream> = None;
        let mut attempted = false;

        while self.is_running() {
            let Some(stream) = reader.as_mut() else {
                if attempted && !self.auto_reconnect() {
                    // parked until auto-reconnect is re-enabled or stop()
                    self.pause(self.config.reconnect_delay());
                    continue;
                }
                attempted = true;

                if !self.pause(self.config.pre_connect_delay()) {
                    break;
                }
                match self.connect_sequence() {
                    Some(stream) => reader = self.install(stream),
                    None => {
                        if self.auto_reconnect() {
                            self.pause(self.config.reconnect_delay());
                        }
                    }
                }
                continue;
            };

            let result = stream.read(&mut buf);
            match result {
                Ok(0) => {
                    reader = None;
                    framer.reset();
                    self.link_lost("closed by peer");
                }
                Ok(n) => {
                    for line in framer.push(&buf[..n]) {
                        tracing::trace!("RX {}: {}", self.endpoint, line);
                        self.listener.on_line(&line);
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    reader = None;
                    framer.reset();
                    self.link_lost(&e.to_string());
                }
            }
        }

        self.close_socket();
        self.state.store(ConnectionState::Disconnected);
        tracing::debug!("Receive loop for {} exited", self.endpoint);
    }

    fn write_line(&self, command: &str) -> io::Result<()> {
        let mut slot = self.socket.lock();
        let stream = slot
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "socket closed"))?;
        stream.write_all(format!("{}{}", command, LINE_TERMINATOR).as_bytes())?;
        stream.flush()
    }

    fn transmit_loop(&self) {
        tracing::debug!("Transmit loop started for {}", self.endpoint);

        while let Some(command) = self.outbound.wait_pop() {
            if self.state.load() != ConnectionState::Connected {
                self.outbound.push_front(command);
                self.pause(self.config.tx_retry_delay());
                continue;
            }

            match self.write_line(&command) {
                Ok(()) => tracing::debug!("TX {}: {}", self.endpoint, command),
                Err(e) => {
                    tracing::warn!(
                        "Failed to send '{}' to {}, requeueing: {}",
                        command,
                        self.endpoint,
                        e
                    );
                    self.outbound.push_front(command);
                    self.state.store(ConnectionState::Disconnected);
                    self.close_socket();
                }
            }
        }

        tracing::debug!("Transmit loop for {} exited", self.endpoint);
    }
}

/// Auto-reconnecting, line-oriented duplex link to one endpoint
pub struct LineTransport {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    started: AtomicBool,
}

impl LineTransport {
    /// Create a stopped transport with its own outbound queue
    pub fn new(
        endpoint: ConnectionEndpoint,
        config: TransportConfig,
        listener: Arc<dyn TransportListener>,
    ) -> Self {
        Self::with_outbound(endpoint, config, listener, Arc::new(OutboundQueue::new()))
    }

    /// Create a stopped transport that drains `outbound`
    pub fn with_outbound(
        endpoint: ConnectionEndpoint,
        config: TransportConfig,
        listener: Arc<dyn TransportListener>,
        outbound: Arc<OutboundQueue>,
    ) -> Self {
        let auto_reconnect = config.auto_reconnect;
        Self {
            shared: Arc::new(Shared {
                endpoint,
                config,
                listener,
                outbound,
                running: AtomicBool::new(false),
                auto_reconnect: AtomicBool::new(auto_reconnect),
                state: AtomicConnectionState::default(),
                socket: Mutex::new(None),
                sleep_lock: Mutex::new(()),
                wake: Condvar::new(),
            }),
            workers: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
        }
    }

    /// Launch the receive and transmit threads
    ///
    /// Calling it again is a no-op, including after [`LineTransport::stop`]:
    /// a transport runs at most once. Only a failure to spawn a thread is an
    /// error; failing to connect just enters the reconnect path.
    pub fn start(&self) -> Result<(), ConnectionError> {
        if self.started.swap(true, Ordering::SeqCst) {
            tracing::debug!("Transport for {} already started", self.shared.endpoint);
            return Ok(());
        }

        tracing::info!("Starting transport for {}", self.shared.endpoint);
        self.shared.running.store(true, Ordering::SeqCst);

        let rx = self.spawn_worker("rx", |shared| shared.receive_loop());
        if let Err(e) = rx {
            self.shared.running.store(false, Ordering::SeqCst);
            return Err(e);
        }

        let tx = self.spawn_worker("tx", |shared| shared.transmit_loop());
        if let Err(e) = tx {
            self.stop();
            return Err(e);
        }

        Ok(())
    }

    fn spawn_worker(
        &self,
        role: &str,
        body: fn(&Shared),
    ) -> Result<(), ConnectionError> {
        let name = format!("cnclink-{}-{}", role, self.shared.endpoint);
        let shared = self.shared.clone();
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || body(&shared))
            .map_err(|e| ConnectionError::ThreadSpawn {
                name,
                reason: e.to_string(),
            })?;
        self.workers.lock().push(handle);
        Ok(())
    }

    /// Stop both loops and wait for them to exit
    ///
    /// Idempotent and safe on a transport that never started. No listener
    /// callback runs after this returns.
    pub fn stop(&self) {
        self.shared.running.store(false, Ordering::SeqCst);
        self.shared.outbound.close();
        self.shared.wake_sleepers();
        self.shared.close_socket();

        let workers: Vec<JoinHandle<()>> = self.workers.lock().drain(..).collect();
        if workers.is_empty() {
            return;
        }

        let current = thread::current().id();
        for handle in workers {
            if handle.thread().id() == current {
                tracing::warn!(
                    "Transport for {} stopped from its own thread; not joining it",
                    self.shared.endpoint
                );
                continue;
            }
            if handle.join().is_err() {
                tracing::error!("Transport thread for {} panicked", self.shared.endpoint);
            }
        }

        self.shared.state.store(ConnectionState::Disconnected);
        tracing::info!("Transport for {} stopped", self.shared.endpoint);
    }

    /// Queue one command line; empty lines are ignored
    pub fn send(&self, line: &str) -> bool {
        self.shared.outbound.push(line)
    }

    /// True while the socket is up
    pub fn is_connected(&self) -> bool {
        self.shared.state.load() == ConnectionState::Connected
    }

    /// Current link state
    pub fn state(&self) -> ConnectionState {
        self.shared.state.load()
    }

    /// True between `start()` and `stop()`
    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    /// Number of commands waiting to be written
    pub fn pending_commands(&self) -> usize {
        self.shared.outbound.len()
    }

    /// Enable or disable reconnecting after failures
    pub fn set_auto_reconnect(&self, enable: bool) {
        self.shared.auto_reconnect.store(enable, Ordering::SeqCst);
        self.shared.wake_sleepers();
    }
}

impl Drop for LineTransport {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    struct Silent;

    impl TransportListener for Silent {}

    fn read_until(peer: &mut TcpStream, needle: &str) -> String {
        peer.set_read_timeout(Some(Duration::from_millis(50))).unwrap();
        let deadline = Instant::now() + Duration::from_secs(3);
        let mut received = Vec::new();
        let mut buf = [0u8; 128];
        while Instant::now() < deadline && !String::from_utf8_lossy(&received).contains(needle) {
            match peer.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => received.extend_from_slice(&buf[..n]),
                Err(_) => {}
            }
        }
        String::from_utf8_lossy(&received).into_owned()
    }

    #[test]
    fn test_resolve_dotted_quad() {
        let endpoint = ConnectionEndpoint::new("192.168.4.1", 23).unwrap();
        let addr = resolve_ipv4(&endpoint).unwrap();
        assert_eq!(addr.to_string(), "192.168.4.1:23");
    }

    #[test]
    fn test_resolve_localhost_is_ipv4() {
        let endpoint = ConnectionEndpoint::new("localhost", 8080).unwrap();
        if let Ok(addr) = resolve_ipv4(&endpoint) {
            assert!(addr.is_ipv4());
            assert_eq!(addr.port(), 8080);
        }
    }

    #[test]
    fn test_resolve_failure() {
        let endpoint = ConnectionEndpoint::new("no-such-host.invalid", 23).unwrap();
        assert!(matches!(
            resolve_ipv4(&endpoint),
            Err(ConnectionError::HostnameResolution { .. })
        ));
    }

    #[test]
    fn test_failed_write_is_retried_before_backlog() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let outbound = Arc::new(OutboundQueue::new());
        let config = TransportConfig {
            tx_retry_delay_ms: 10,
            ..TransportConfig::default()
        };
        let transport = LineTransport::with_outbound(
            ConnectionEndpoint::new("127.0.0.1", port).unwrap(),
            config,
            Arc::new(Silent),
            outbound.clone(),
        );
        let shared = transport.shared.clone();

        // writes on a socket shut down for writing fail with a broken pipe
        let broken = TcpStream::connect(("127.0.0.1", port)).unwrap();
        let (_first_peer, _) = listener.accept().unwrap();
        broken.shutdown(Shutdown::Write).unwrap();
        *shared.socket.lock() = Some(broken);
        shared.state.store(ConnectionState::Connected);

        assert!(outbound.push("G1 X1"));
        assert!(outbound.push("G1 X2"));

        shared.running.store(true, Ordering::SeqCst);
        let worker = {
            let shared = shared.clone();
            thread::spawn(move || shared.transmit_loop())
        };

        let deadline = Instant::now() + Duration::from_secs(3);
        while shared.socket.lock().is_some() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        assert!(shared.socket.lock().is_none());
        assert_eq!(shared.state.load(), ConnectionState::Disconnected);

        let writer = TcpStream::connect(("127.0.0.1", port)).unwrap();
        let (mut second_peer, _) = listener.accept().unwrap();
        *shared.socket.lock() = Some(writer);
        shared.state.store(ConnectionState::Connected);

        assert_eq!(
            read_until(&mut second_peer, "G1 X2\r\n"),
            "G1 X1\r\nG1 X2\r\n"
        );
        assert!(outbound.is_empty());

        shared.running.store(false, Ordering::SeqCst);
        outbound.close();
        shared.wake_sleepers();
        worker.join().unwrap();
    }
}
