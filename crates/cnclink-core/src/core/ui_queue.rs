//! UI work queue collaborator
//!
//! Background threads never touch presentation state directly. They post
//! zero-argument closures onto a [`UiQueue`]; the UI thread drains the queue
//! and runs them in posting order.

use crate::types::UiTask;
use tokio::sync::mpsc;

/// Thread-safe queue of work to run on the UI thread
///
/// No priority and no cancellation of already posted work.
pub trait UiQueue: Send + Sync {
    /// Enqueue `task` for later execution on the UI thread
    fn post(&self, task: UiTask);
}

/// Channel-backed UI queue
///
/// Cheap to clone; every clone posts into the same [`UiQueueReceiver`].
#[derive(Clone)]
pub struct ChannelUiQueue {
    tx: mpsc::UnboundedSender<UiTask>,
}

/// Draining end of a [`ChannelUiQueue`], owned by the UI thread
pub struct UiQueueReceiver {
    rx: mpsc::UnboundedReceiver<UiTask>,
}

impl ChannelUiQueue {
    /// Create a queue and its draining end
    pub fn new() -> (Self, UiQueueReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, UiQueueReceiver { rx })
    }
}

impl UiQueue for ChannelUiQueue {
    fn post(&self, task: UiTask) {
        if self.tx.send(task).is_err() {
            tracing::debug!("UI queue receiver dropped, discarding task");
        }
    }
}

impl UiQueueReceiver {
    /// Run every task queued so far; returns how many ran
    pub fn drain(&mut self) -> usize {
        let mut count = 0;
        while let Ok(task) = self.rx.try_recv() {
            task();
            count += 1;
        }
        count
    }

    /// Block until one task is available and run it
    ///
    /// Returns false once every sender has been dropped. Must not be called
    /// from inside an async runtime.
    pub fn run_next_blocking(&mut self) -> bool {
        match self.rx.blocking_recv() {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }

    /// Await one task and run it; returns false once every sender is gone
    pub async fn run_next(&mut self) -> bool {
        match self.rx.recv().await {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }
}
