use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Transfer endpoint of a datanode holding a replica.
///
/// The host is kept as given by the naming service (usually an IP literal,
/// sometimes a hostname) and only resolved when dialing.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    pub host: String,
    pub port: u16,
}

impl Location {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Debug for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Bracket IPv6 literals so the port separator stays unambiguous.
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl FromStr for Location {
    type Err = LocationParseError;

    /// Parse `"host:port"` or `"[v6-literal]:port"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port_str) = s.rsplit_once(':').ok_or(LocationParseError::MissingPort)?;
        let host = match host.strip_prefix('[') {
            Some(inner) => inner
                .strip_suffix(']')
                .ok_or(LocationParseError::InvalidHost)?,
            None => host,
        };
        if host.is_empty() {
            return Err(LocationParseError::InvalidHost);
        }
        let port: u16 = port_str
            .parse()
            .map_err(|_| LocationParseError::InvalidPort)?;
        Ok(Location::new(host, port))
    }
}

/// Errors when parsing a `Location` from a string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationParseError {
    #[error("missing ':port' suffix")]
    MissingPort,
    #[error("invalid port number")]
    InvalidPort,
    #[error("invalid host")]
    InvalidHost,
}
