//! Outbound command queue with retry-at-head semantics
//!
//! Commands are queued by any thread and consumed by one transmit loop.
//! A command that could not be written goes back to the *front* of the
//! queue so it is retried before the rest of the backlog.
//!
//! # Features
//! - FIFO queueing from any thread
//! - Push-front for failed or deferred commands
//! - Condition-variable wakeup of the transmit loop
//! - Shutdown signal that releases a blocked consumer

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Strip trailing line terminators a caller may have appended
///
/// `None` for an empty command or one that still holds a line break,
/// which would reach the controller as more than one line.
pub(crate) fn normalize_command(command: &str) -> Option<&str> {
    let command = command.trim_end_matches(['\r', '\n']);
    if command.is_empty() || command.contains(['\r', '\n']) {
        return None;
    }
    Some(command)
}

/// Pending-command queue shared between senders and the transmit loop
#[derive(Debug, Default)]
pub struct OutboundQueue {
    commands: Mutex<VecDeque<String>>,
    ready: Condvar,
    shutdown: Condvar,
    closed: AtomicBool,
}

impl OutboundQueue {
    /// Create an empty, open queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a command for sending
    ///
    /// Empty commands and commands with an embedded line break are
    /// rejected. Returns true if the command was queued.
    pub fn push(&self, command: &str) -> bool {
        let Some(command) = normalize_command(command) else {
            tracing::debug!("Rejected outbound command {:?}", command);
            return false;
        };

        let mut queue = self.commands.lock();
        queue.push_back(command.to_string());
        self.ready.notify_one();
        true
    }

    /// Put a command back at the head of the queue for retry
    pub fn push_front(&self, command: String) {
        let mut queue = self.commands.lock();
        queue.push_front(command);
        self.ready.notify_one();
    }

    /// Wait until a command is available or the queue is closed
    ///
    /// Returns `None` once the queue is closed, even if commands remain;
    /// they stay queued and still count towards [`OutboundQueue::len`].
    pub fn wait_pop(&self) -> Option<String> {
        let mut queue = self.commands.lock();
        loop {
            if self.is_closed() {
                return None;
            }
            if let Some(command) = queue.pop_front() {
                return Some(command);
            }
            self.ready.wait(&mut queue);
        }
    }

    /// Release every waiting consumer; subsequent waits return `None`
    pub fn close(&self) {
        let _queue = self.commands.lock();
        self.closed.store(true, Ordering::SeqCst);
        self.ready.notify_all();
        self.shutdown.notify_all();
    }

    /// Block for up to `timeout` or until the queue is closed
    ///
    /// Returns true if the queue was closed.
    pub fn wait_closed(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut queue = self.commands.lock();
        while !self.is_closed() {
            if self.shutdown.wait_until(&mut queue, deadline).timed_out() {
                break;
            }
        }
        self.is_closed()
    }

    /// True once [`OutboundQueue::close`] has been called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Get the number of queued commands
    pub fn len(&self) -> usize {
        self.commands.lock().len()
    }

    /// True if nothing is queued
    pub fn is_empty(&self) -> bool {
        self.commands.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_command() {
        assert_eq!(normalize_command("G0 X1\r\n"), Some("G0 X1"));
        assert_eq!(normalize_command("$H\n"), Some("$H"));
        assert_eq!(normalize_command("?"), Some("?"));
        assert_eq!(normalize_command("\r\n"), None);
    }

    #[test]
    fn test_embedded_line_breaks_rejected() {
        let queue = OutboundQueue::new();
        assert!(!queue.push("G0\nG1"));
        assert!(!queue.push("G0\rG1\r\n"));
        assert!(!queue.push("\nG0"));
        assert!(queue.is_empty());

        assert!(queue.push("G0 X1\r\n"));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_wait_closed_times_out_while_open() {
        let queue = OutboundQueue::new();
        let started = Instant::now();
        assert!(!queue.wait_closed(Duration::from_millis(30)));
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_empty_commands_ignored() {
        let queue = OutboundQueue::new();
        assert!(!queue.push(""));
        assert!(!queue.push("\r\n"));
        assert!(queue.is_empty());
    }
}
