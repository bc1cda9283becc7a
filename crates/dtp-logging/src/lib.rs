//! Tracing subscriber setup for the dtp tools.
//!
//! Console output goes to stderr: the tools stream block data on stdout.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing_appender::rolling;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub use tracing::{debug, error, info, trace, warn};

/// How often the log file rolls over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rotation {
    Hourly,
    #[default]
    Daily,
    Never,
}

impl From<Rotation> for rolling::Rotation {
    fn from(rotation: Rotation) -> Self {
        match rotation {
            Rotation::Hourly => rolling::Rotation::HOURLY,
            Rotation::Daily => rolling::Rotation::DAILY,
            Rotation::Never => rolling::Rotation::NEVER,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is unset, e.g. `"info"` or
    /// `"dtp_client=debug,info"`.
    pub level: String,

    /// Directory for log files. No file logging when unset.
    pub log_dir: Option<PathBuf>,

    pub file_prefix: String,

    pub rotation: Rotation,

    /// Emit JSON lines instead of the human-readable format.
    pub json_format: bool,

    /// Also log to stderr.
    pub console_output: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: "info".into(),
            log_dir: None,
            file_prefix: "dtp".into(),
            rotation: Rotation::default(),
            json_format: false,
            console_output: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("invalid log filter {directive:?}: {source}")]
    Filter {
        directive: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },

    #[error("cannot create log file in {dir:?}: {source}")]
    Appender {
        dir: PathBuf,
        #[source]
        source: rolling::InitError,
    },

    #[error("a global subscriber is already installed")]
    AlreadyInitialized,
}

type BoxedLayer<S> = Box<dyn tracing_subscriber::Layer<S> + Send + Sync>;

fn env_filter(config: &LogConfig) -> Result<EnvFilter, LoggingError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level).map_err(|source| LoggingError::Filter {
            directive: config.level.clone(),
            source,
        }),
    }
}

/// Install the global subscriber.
///
/// Call once at startup. The returned guard flushes the file writer on drop
/// and must be kept alive for as long as logs should reach the file.
pub fn init_logging(
    config: &LogConfig,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>, LoggingError> {
    let registry = tracing_subscriber::registry().with(env_filter(config)?);

    let console_layer: Option<BoxedLayer<_>> = if config.console_output {
        if config.json_format {
            Some(Box::new(fmt::layer().json().with_writer(std::io::stderr)))
        } else {
            Some(Box::new(fmt::layer().with_writer(std::io::stderr)))
        }
    } else {
        None
    };

    let (file_layer, guard): (Option<BoxedLayer<_>>, _) = match config.log_dir {
        Some(ref log_dir) => {
            let appender = rolling::RollingFileAppender::builder()
                .rotation(config.rotation.into())
                .filename_prefix(&config.file_prefix)
                .filename_suffix("log")
                .build(log_dir)
                .map_err(|source| LoggingError::Appender {
                    dir: log_dir.clone(),
                    source,
                })?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer: BoxedLayer<_> = if config.json_format {
                Box::new(fmt::layer().json().with_ansi(false).with_writer(writer))
            } else {
                Box::new(fmt::layer().with_ansi(false).with_writer(writer))
            };
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    registry
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|_| LoggingError::AlreadyInitialized)?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.rotation, Rotation::Daily);
        assert!(config.console_output);
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: LogConfig = toml::from_str(
            r#"
            level = "dtp_client=debug"
            rotation = "hourly"
            "#,
        )
        .unwrap();
        assert_eq!(config.level, "dtp_client=debug");
        assert_eq!(config.rotation, Rotation::Hourly);
        assert_eq!(config.file_prefix, "dtp");
        assert!(!config.json_format);
    }

    #[test]
    fn test_rotation_conversion() {
        assert_eq!(rolling::Rotation::from(Rotation::Never), rolling::Rotation::NEVER);
        assert_eq!(rolling::Rotation::from(Rotation::Hourly), rolling::Rotation::HOURLY);
    }
}
