//! Message severity for user-visible log lines

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity attached to a message notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageLevel {
    /// Informational
    Info,
    /// Something the user should notice
    Warning,
    /// A failed operation
    Error,
}

impl MessageLevel {
    /// Wire/UI label ("INFO", "WARNING", "ERROR")
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for MessageLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
