//! Server configuration.

use std::time::Duration;

use packetforge_transport::FramingConfig;
use serde::{Deserialize, Serialize};

/// Settings for a [`PacketServer`](crate::PacketServer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the listener binds to.
    pub bind_addr: String,

    /// How inbound bytes are cut into messages and replies are terminated.
    pub framing: FramingConfig,

    /// Inbound messages carry a sequence counter before the header token.
    pub includes_leading_counter: bool,

    /// A connection that sends nothing for this long is closed.
    pub idle_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:4000".to_string(),
            framing: FramingConfig::default(),
            includes_leading_counter: false,
            idle_timeout: Duration::from_secs(60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr, "127.0.0.1:4000");
        assert_eq!(config.framing, FramingConfig::default());
        assert!(!config.includes_leading_counter);
        assert_eq!(config.idle_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_partial_config_from_json() {
        let json = r#"{ "bind_addr": "0.0.0.0:4010", "includes_leading_counter": true }"#;
        let config: ServerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:4010");
        assert!(config.includes_leading_counter);
        assert_eq!(config.idle_timeout, Duration::from_secs(60));
        assert!(config.framing.use_framing);
    }

    #[test]
    fn test_framing_from_json() {
        let json = r#"{ "framing": { "delimiter": 10, "use_framing": true } }"#;
        let config: ServerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.framing.delimiter, b'\n');
        assert_eq!(config.framing.max_message_len, 4096);
    }
}
