//! Configuration loading.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Default listen address
pub const DEFAULT_ADDR: &str = "127.0.0.1:6667";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Server configuration.
///
/// Every field has a default, so an empty file is a valid configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g. "0.0.0.0:6667"; port 0 picks an ephemeral port).
    pub listen_addr: String,
    /// Longest accepted client line in bytes, excluding the terminator.
    pub max_line_length: usize,
    /// Messages buffered per session before deliveries to it are dropped.
    pub outbound_queue: usize,
    /// Commands buffered between connection handlers and the registry.
    pub command_queue: usize,
    /// Fallback log filter when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_ADDR.to_string(),
            max_line_length: 8191,
            outbound_queue: 256,
            command_queue: 1024,
            log_filter: "irc_lite=info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Default configuration bound to `addr`.
    pub fn with_addr(addr: impl Into<String>) -> Self {
        Self {
            listen_addr: addr.into(),
            ..Self::default()
        }
    }

    /// Parse a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = ServerConfig::from_toml_str("").unwrap();
        assert_eq!(config.listen_addr, DEFAULT_ADDR);
        assert_eq!(config.max_line_length, 8191);
        assert_eq!(config.outbound_queue, 256);
    }

    #[test]
    fn test_partial_document_overrides() {
        let config = ServerConfig::from_toml_str(
            r#"
            listen_addr = "0.0.0.0:7000"
            outbound_queue = 8
            "#,
        )
        .unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:7000");
        assert_eq!(config.outbound_queue, 8);
        assert_eq!(config.command_queue, 1024);
    }

    #[test]
    fn test_invalid_document_errors() {
        let err = ServerConfig::from_toml_str("outbound_queue = \"lots\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_with_addr() {
        let config = ServerConfig::with_addr("127.0.0.1:0");
        assert_eq!(config.listen_addr, "127.0.0.1:0");
        assert_eq!(config.log_filter, "irc_lite=info");
    }
}
