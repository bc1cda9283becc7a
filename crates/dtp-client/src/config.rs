//! Reader configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Settings shared by every [`BlockReader`](crate::BlockReader) a client opens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockReaderConfig {
    /// Name sent to datanodes in every op header.
    pub client_name: String,

    /// Bound on establishing one datanode connection.
    #[serde(with = "secs")]
    pub connect_timeout: Duration,

    /// Receive timeout applied to datanode sockets. Unbounded when unset.
    #[serde(with = "opt_secs")]
    pub read_timeout: Option<Duration>,

    /// Acknowledge a fully read range with `CHECKSUM_OK`.
    pub send_read_status: bool,

    /// How long a read at the end of the block waits for the datanode's
    /// end-of-block packet before closing without acknowledging.
    #[serde(with = "secs")]
    pub drain_timeout: Duration,

    /// Disable Nagle on datanode sockets.
    pub tcp_nodelay: bool,
}

impl Default for BlockReaderConfig {
    fn default() -> Self {
        Self {
            client_name: "dtp-client".into(),
            connect_timeout: Duration::from_secs(10),
            read_timeout: None,
            send_read_status: true,
            drain_timeout: Duration::from_millis(500),
            tcp_nodelay: true,
        }
    }
}

impl BlockReaderConfig {
    /// Parse a TOML document; missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.client_name.is_empty() {
            return Err(ConfigError::Invalid("client_name must not be empty".into()));
        }
        if self.connect_timeout.is_zero() {
            return Err(ConfigError::Invalid("connect_timeout must be positive".into()));
        }
        if self.drain_timeout.is_zero() {
            return Err(ConfigError::Invalid("drain_timeout must be positive".into()));
        }
        if self.read_timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::Invalid("read_timeout must be positive when set".into()));
        }
        Ok(())
    }
}

/// Durations as floating-point seconds.
mod secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

mod opt_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs_f64()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<f64>::deserialize(deserializer)?
            .map(|secs| Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = BlockReaderConfig::default();
        assert_eq!(cfg.client_name, "dtp-client");
        assert_eq!(cfg.connect_timeout, Duration::from_secs(10));
        assert!(cfg.read_timeout.is_none());
        assert!(cfg.send_read_status);
        assert_eq!(cfg.drain_timeout, Duration::from_millis(500));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_from_toml_partial() {
        let cfg = BlockReaderConfig::from_toml_str(
            r#"
            client_name = "etl-worker-3"
            connect_timeout = 2.5
            read_timeout = 30
            "#,
        )
        .unwrap();
        assert_eq!(cfg.client_name, "etl-worker-3");
        assert_eq!(cfg.connect_timeout, Duration::from_millis(2500));
        assert_eq!(cfg.read_timeout, Some(Duration::from_secs(30)));
        assert!(cfg.tcp_nodelay);
    }

    #[test]
    fn test_from_toml_rejects_zero_timeout() {
        let err = BlockReaderConfig::from_toml_str("connect_timeout = 0.0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_from_toml_rejects_zero_drain_timeout() {
        let err = BlockReaderConfig::from_toml_str("drain_timeout = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_from_toml_rejects_negative_timeout() {
        let err = BlockReaderConfig::from_toml_str("connect_timeout = -1.0").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = BlockReaderConfig::load("/nonexistent/dtp/reader.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let cfg = BlockReaderConfig {
            read_timeout: Some(Duration::from_secs(5)),
            ..BlockReaderConfig::default()
        };
        let json = serde_json::to_string(&cfg).unwrap();
        let parsed: BlockReaderConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, cfg);
    }
}
