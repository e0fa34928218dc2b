//! # CncLink Core
//!
//! Core types, traits, and utilities for CncLink.
//! Provides the endpoint and telemetry data model, the transport
//! configuration, the error types, and the two collaborator interfaces the
//! communication layer consumes: the UI work queue and the error reporter.

pub mod config;
pub mod core;
pub mod data;
pub mod error;
pub mod types;

pub use config::TransportConfig;

pub use core::{
    ChannelUiQueue, ErrorReporter, MemoryErrorReporter, MessageLevel, Report,
    TracingErrorReporter, UiQueue, UiQueueReceiver,
};

pub use data::{
    AtomicConnectionState, ConnectionEndpoint, ConnectionState, PositionVector, Telemetry,
};

pub use error::{ConnectionError, Error, Result};

pub use types::{thread_safe_rw, thread_safe_vec, ThreadSafeRw, ThreadSafeVec, UiTask};
