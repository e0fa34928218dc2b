//! Error reporter collaborator
//!
//! The connection manager is the only component that talks to the reporter.
//! Applications plug in whatever surfaces problems to the user (a dialog,
//! a notification area); [`TracingErrorReporter`] simply logs.

use crate::core::message::MessageLevel;
use crate::types::{thread_safe_vec, ThreadSafeVec};

/// One report delivered to an [`ErrorReporter`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// Severity
    pub level: MessageLevel,
    /// Short title
    pub title: String,
    /// One-line summary
    pub message: String,
    /// Multi-line diagnostic detail (may be empty)
    pub details: String,
}

/// Sink for user-facing problem reports
pub trait ErrorReporter: Send + Sync {
    /// Report a failed operation
    fn report_error(&self, title: &str, message: &str, details: &str);

    /// Report a condition worth the user's attention
    fn report_warning(&self, title: &str, message: &str, details: &str);

    /// Report an informational notice
    fn report_info(&self, _title: &str, _message: &str, _details: &str) {}
}

/// Reporter that writes every report to the `tracing` log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingErrorReporter;

impl ErrorReporter for TracingErrorReporter {
    fn report_error(&self, title: &str, message: &str, details: &str) {
        tracing::error!(%title, %details, "{}", message);
    }

    fn report_warning(&self, title: &str, message: &str, details: &str) {
        tracing::warn!(%title, %details, "{}", message);
    }

    fn report_info(&self, title: &str, message: &str, details: &str) {
        tracing::info!(%title, %details, "{}", message);
    }
}

/// Reporter that keeps every report in memory
///
/// Handy for headless front ends and tests.
#[derive(Clone)]
pub struct MemoryErrorReporter {
    reports: ThreadSafeVec<Report>,
}

impl MemoryErrorReporter {
    /// Create an empty reporter
    pub fn new() -> Self {
        Self {
            reports: thread_safe_vec(),
        }
    }

    /// Copy of all reports so far
    pub fn reports(&self) -> Vec<Report> {
        self.reports.lock().clone()
    }

    /// Reports of a given severity
    pub fn reports_at(&self, level: MessageLevel) -> Vec<Report> {
        self.reports
            .lock()
            .iter()
            .filter(|r| r.level == level)
            .cloned()
            .collect()
    }

    fn push(&self, level: MessageLevel, title: &str, message: &str, details: &str) {
        self.reports.lock().push(Report {
            level,
            title: title.to_string(),
            message: message.to_string(),
            details: details.to_string(),
        });
    }
}

impl Default for MemoryErrorReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorReporter for MemoryErrorReporter {
    fn report_error(&self, title: &str, message: &str, details: &str) {
        self.push(MessageLevel::Error, title, message, details);
    }

    fn report_warning(&self, title: &str, message: &str, details: &str) {
        self.push(MessageLevel::Warning, title, message, details);
    }

    fn report_info(&self, title: &str, message: &str, details: &str) {
        self.push(MessageLevel::Info, title, message, details);
    }
}
