//! # Configuration
//!
//! Node identity and call defaults, read from TOML.
//!
//! ```toml
//! [server]
//! id = "room-1"
//! type = "room"
//!
//! [server.metadata]
//! region = "eu"
//!
//! [rpc]
//! timeout_ms = 5000
//! serializer = "json"
//! ```

use std::time::Duration;

use serde::Deserialize;

use crate::serialize::SerializerKind;
use crate::server::Server;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    /// This node's identity.
    pub server: Server,
    #[serde(default)]
    pub rpc: RpcConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    /// Deadline applied to calls whose context carries none.
    pub timeout_ms: u64,
    pub serializer: SerializerKind,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            serializer: SerializerKind::default(),
        }
    }
}

impl RpcConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Config {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.id.is_empty() {
            return Err(ConfigError::Invalid("server.id must not be empty".into()));
        }
        if self.server.kind.is_empty() {
            return Err(ConfigError::Invalid("server.type must not be empty".into()));
        }
        if self.rpc.timeout_ms == 0 {
            return Err(ConfigError::Invalid("rpc.timeout_ms must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_document() {
        let config = Config::from_toml_str(
            r#"
            [server]
            id = "room-1"
            type = "room"
            hostname = "host-a"
            frontend = false

            [server.metadata]
            region = "eu"

            [rpc]
            timeout_ms = 250
            serializer = "binary"
            "#,
        )
        .expect("valid config");

        assert_eq!(config.server.id, "room-1");
        assert_eq!(config.server.kind, "room");
        assert_eq!(
            config.server,
            Server::new("room-1", "room")
                .with_hostname("host-a")
                .with_frontend(false)
                .with_metadata("region", "eu")
        );
        assert_eq!(config.rpc.timeout(), Duration::from_millis(250));
        assert_eq!(config.rpc.serializer, SerializerKind::Binary);
    }

    #[test]
    fn test_rpc_section_defaults() {
        let config = Config::from_toml_str(
            r#"
            [server]
            id = "conn-1"
            type = "connector"
            "#,
        )
        .unwrap();

        assert_eq!(config.rpc, RpcConfig::default());
        assert_eq!(config.rpc.timeout_ms, DEFAULT_TIMEOUT_MS);
        assert!(!config.server.frontend);
    }

    #[test]
    fn test_rejects_empty_identity() {
        let err = Config::from_toml_str(
            r#"
            [server]
            id = ""
            type = "room"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let err = Config::from_toml_str(
            r#"
            [server]
            id = "room-1"
            type = "room"

            [rpc]
            timeout_ms = 0
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_unknown_serializer() {
        let err = Config::from_toml_str(
            r#"
            [server]
            id = "room-1"
            type = "room"

            [rpc]
            serializer = "xml"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
