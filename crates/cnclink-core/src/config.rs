//! Transport timing and buffering configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timings and limits used by a line transport and its session
///
/// All durations are stored in milliseconds so the struct maps directly
/// onto the settings file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Timeout for one TCP connect attempt (also used as write timeout)
    pub connect_timeout_ms: u64,
    /// Delay between attempts inside one connection sequence
    pub connect_retry_delay_ms: u64,
    /// Delay after a failed connection sequence before the next one
    pub reconnect_delay_ms: u64,
    /// Delay before each connection sequence starts
    pub pre_connect_delay_ms: u64,
    /// Delay before retrying a command while the link is down
    pub tx_retry_delay_ms: u64,
    /// Delay between a fresh connection and the initial status query
    pub status_query_delay_ms: u64,
    /// Command sent to prime telemetry after connecting
    pub status_query: String,
    /// Size of the receive buffer in bytes
    pub read_buffer_size: usize,
    /// Keep retrying after failed or lost connections
    pub auto_reconnect: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 5000,
            connect_retry_delay_ms: 2000,
            reconnect_delay_ms: 1000,
            pre_connect_delay_ms: 500,
            tx_retry_delay_ms: 500,
            status_query_delay_ms: 100,
            status_query: "?".to_string(),
            read_buffer_size: 1024,
            auto_reconnect: true,
        }
    }
}

impl TransportConfig {
    /// Connect attempt timeout
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Delay between attempts inside one connection sequence
    pub fn connect_retry_delay(&self) -> Duration {
        Duration::from_millis(self.connect_retry_delay_ms)
    }

    /// Delay after a failed connection sequence
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Delay before each connection sequence
    pub fn pre_connect_delay(&self) -> Duration {
        Duration::from_millis(self.pre_connect_delay_ms)
    }

    /// Delay before retrying a command while the link is down
    pub fn tx_retry_delay(&self) -> Duration {
        Duration::from_millis(self.tx_retry_delay_ms)
    }

    /// Delay before the initial status query
    pub fn status_query_delay(&self) -> Duration {
        Duration::from_millis(self.status_query_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TransportConfig::default();
        assert_eq!(config.connect_timeout(), Duration::from_secs(5));
        assert_eq!(config.reconnect_delay(), Duration::from_secs(1));
        assert_eq!(config.status_query, "?");
        assert!(config.auto_reconnect);
    }

    #[test]
    fn test_partial_deserialize_uses_defaults() {
        let config: TransportConfig =
            serde_json::from_str(r#"{"connect_timeout_ms": 750}"#).unwrap();
        assert_eq!(config.connect_timeout_ms, 750);
        assert_eq!(config.tx_retry_delay_ms, 500);
        assert_eq!(config.read_buffer_size, 1024);
    }
}
