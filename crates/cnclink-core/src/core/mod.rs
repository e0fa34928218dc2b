//! Collaborator interfaces consumed by the communication layer

pub mod message;
pub mod reporter;
pub mod ui_queue;

pub use message::MessageLevel;
pub use reporter::{ErrorReporter, MemoryErrorReporter, Report, TracingErrorReporter};
pub use ui_queue::{ChannelUiQueue, UiQueue, UiQueueReceiver};
