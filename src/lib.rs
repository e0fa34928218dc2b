//! # CncLink
//!
//! Auto-reconnecting line-protocol link to FluidNC and GRBL controllers
//! over raw TCP.
//!
//! ## Architecture
//!
//! CncLink is organized as a workspace with multiple crates:
//!
//! 1. **cnclink-core** - Endpoint and telemetry types, transport config,
//!    errors, and the UI queue / error reporter interfaces
//! 2. **cnclink-communication** - Line transport, status parsing, device
//!    sessions and the connection manager
//! 3. **cnclink-settings** - Settings file loading, saving and validation
//! 4. **cnclink** - Command-line front end that ties them together

pub use cnclink_communication::{
    CommunicationManager, DeviceSession, LineTransport, ManagerCallbacks, StatusFrame,
    StatusParser,
};

pub use cnclink_core::{
    ChannelUiQueue, ConnectionEndpoint, ConnectionError, ConnectionState, Error, ErrorReporter,
    MessageLevel, PositionVector, Result, Telemetry, TracingErrorReporter, TransportConfig,
    UiQueue, UiQueueReceiver,
};

pub use cnclink_settings::{Config, LoggingSettings, SettingsPersistence};

use tracing_subscriber::EnvFilter;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Level filter for the given settings; `RUST_LOG` wins when set
pub fn build_filter(settings: &LoggingSettings) -> anyhow::Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => Ok(EnvFilter::try_new(settings.level.to_ascii_lowercase())?),
    }
}

/// Initialize logging
///
/// Sets up structured logging with:
/// - stderr output, leaving stdout to the console session
/// - RUST_LOG environment variable support
/// - Thread names, so rx/tx loops of each device are told apart
/// - Optional JSON lines for log shippers
pub fn init_logging(settings: &LoggingSettings) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let env_filter = build_filter(settings)?;

    if settings.json {
        let fmt_layer = fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_thread_names(true)
            .with_target(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;
    } else {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true)
            .with_thread_names(true)
            .with_line_number(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter_accepts_configured_level() {
        let settings = LoggingSettings {
            level: "DEBUG".to_string(),
            json: false,
        };
        assert!(build_filter(&settings).is_ok());
    }

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
        assert!(!BUILD_DATE.is_empty());
    }
}
