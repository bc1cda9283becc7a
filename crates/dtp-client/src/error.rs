//! Client error types.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use dtp_proto::ProtoError;
use dtp_types::BlockId;

/// Errors that can occur while reading a block.
///
/// Everything except [`Closed`](Self::Closed), [`Exhausted`](Self::Exhausted)
/// and [`NoDatanodes`](Self::NoDatanodes) describes one failed datanode and is
/// absorbed by the failover loop; callers only see it as the last recorded
/// error once every replica has failed. `Clone` lets that last error be
/// reported on every later call.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BlockReadError {
    /// Dialing, sending or receiving failed.
    #[error("io error: {0}")]
    Io(#[source] Arc<io::Error>),

    /// The response or a packet could not be framed or decoded.
    #[error("protocol error: {0}")]
    Proto(#[from] ProtoError),

    /// A chunk did not match its checksum.
    #[error("checksum mismatch for chunk at block offset {offset}: expected {expected:#010x}, computed {actual:#010x}")]
    ChecksumMismatch { offset: u64, expected: u32, actual: u32 },

    /// The datanode wants an algorithm this client does not implement.
    #[error("unsupported checksum type {0}")]
    UnsupportedChecksum(i32),

    /// The datanode answered the read op with a non-success status.
    #[error("datanode refused read with status {status}: {message}")]
    OpFailed { status: String, message: String },

    #[error("read response carried no checksum info")]
    MissingChecksumInfo,

    #[error("invalid bytes-per-checksum {0}")]
    InvalidChunkSize(u32),

    /// The chunk stream would start after the requested offset.
    #[error("chunk stream starts at {chunk_offset}, past requested offset {requested}")]
    InvalidChunkOffset { chunk_offset: u64, requested: u64 },

    #[error("packet for block offset {actual} arrived while expecting {expected}")]
    UnexpectedPacketOffset { expected: u64, actual: u64 },

    #[error("packet carries {actual} checksums for {expected} chunks")]
    ChecksumCountMismatch { expected: usize, actual: usize },

    /// Every candidate datanode has been handed out.
    #[error("no datanodes left to try")]
    Exhausted,

    /// Failover ran out of candidates without recording any failure.
    #[error("no available datanodes for block {0}")]
    NoDatanodes(BlockId),

    /// The reader was closed.
    #[error("block reader is closed")]
    Closed,
}

impl From<io::Error> for BlockReadError {
    fn from(err: io::Error) -> Self {
        BlockReadError::Io(Arc::new(err))
    }
}

impl BlockReadError {
    /// The `io::ErrorKind` this error maps to at the `std::io::Read` boundary.
    pub fn io_kind(&self) -> io::ErrorKind {
        match self {
            BlockReadError::Io(err) => err.kind(),
            BlockReadError::Proto(err) if err.is_unexpected_eof() => io::ErrorKind::UnexpectedEof,
            BlockReadError::Proto(_)
            | BlockReadError::ChecksumMismatch { .. }
            | BlockReadError::UnexpectedPacketOffset { .. }
            | BlockReadError::ChecksumCountMismatch { .. }
            | BlockReadError::MissingChecksumInfo
            | BlockReadError::InvalidChunkSize(_)
            | BlockReadError::InvalidChunkOffset { .. } => io::ErrorKind::InvalidData,
            BlockReadError::UnsupportedChecksum(_) => io::ErrorKind::Unsupported,
            BlockReadError::OpFailed { .. } => io::ErrorKind::Other,
            BlockReadError::Exhausted | BlockReadError::NoDatanodes(_) => io::ErrorKind::NotFound,
            BlockReadError::Closed => io::ErrorKind::BrokenPipe,
        }
    }
}

impl From<BlockReadError> for io::Error {
    fn from(err: BlockReadError) -> Self {
        io::Error::new(err.io_kind(), err)
    }
}

/// Convenience result type.
pub type BlockReadResult<T> = std::result::Result<T, BlockReadError>;

/// Errors loading a [`BlockReaderConfig`](crate::BlockReaderConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_maps_to_broken_pipe() {
        let err: io::Error = BlockReadError::Closed.into();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_io_kind_is_preserved() {
        let err = BlockReadError::from(io::Error::from(io::ErrorKind::ConnectionRefused));
        assert_eq!(err.io_kind(), io::ErrorKind::ConnectionRefused);
        assert!(matches!(err.clone(), BlockReadError::Io(_)));
    }

    #[test]
    fn test_truncated_proto_is_unexpected_eof() {
        let err = BlockReadError::from(ProtoError::UnexpectedEof);
        assert_eq!(err.io_kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_display_checksum_mismatch() {
        let err = BlockReadError::ChecksumMismatch {
            offset: 512,
            expected: 0xAABBCCDD,
            actual: 0x11223344,
        };
        let s = err.to_string();
        assert!(s.contains("512"));
        assert!(s.contains("0xaabbccdd"));
        assert!(s.contains("0x11223344"));
    }

    #[test]
    fn test_display_no_datanodes() {
        let err = BlockReadError::NoDatanodes(BlockId(77));
        assert_eq!(err.to_string(), "no available datanodes for block 77");
    }
}
