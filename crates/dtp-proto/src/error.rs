use std::io;
use std::sync::Arc;

use thiserror::Error;

/// Errors raised while framing or parsing data-transfer messages.
///
/// `Clone` so a failure can be remembered and reported again; the I/O source
/// is shared behind an `Arc` for that reason.
#[derive(Debug, Clone, Error)]
pub enum ProtoError {
    /// The underlying stream failed (includes truncated reads).
    #[error("io error: {0}")]
    Io(#[source] Arc<io::Error>),

    /// The stream ended before a complete length prefix was seen.
    #[error("unexpected end of stream")]
    UnexpectedEof,

    /// A message body could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] prost::DecodeError),

    /// A length prefix announced more bytes than we are willing to buffer.
    #[error("message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: u64, max: u64 },

    /// A packet header is inconsistent with itself.
    #[error("malformed packet: {0}")]
    MalformedPacket(String),
}

impl From<io::Error> for ProtoError {
    fn from(err: io::Error) -> Self {
        ProtoError::Io(Arc::new(err))
    }
}

impl ProtoError {
    /// Whether the error means the peer went away mid-message.
    pub fn is_unexpected_eof(&self) -> bool {
        match self {
            ProtoError::UnexpectedEof => true,
            ProtoError::Io(err) => err.kind() == io::ErrorKind::UnexpectedEof,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_conversion() {
        let err: ProtoError = io::Error::new(io::ErrorKind::BrokenPipe, "pipe broke").into();
        assert!(matches!(err, ProtoError::Io(_)));
        assert!(err.to_string().contains("pipe broke"));
        assert!(!err.is_unexpected_eof());
    }

    #[test]
    fn test_unexpected_eof_detection() {
        let truncated: ProtoError = io::Error::from(io::ErrorKind::UnexpectedEof).into();
        assert!(truncated.is_unexpected_eof());
        assert!(ProtoError::UnexpectedEof.is_unexpected_eof());
    }

    #[test]
    fn test_clone_shares_source() {
        let err: ProtoError = io::Error::new(io::ErrorKind::ConnectionReset, "reset").into();
        let copy = err.clone();
        assert_eq!(err.to_string(), copy.to_string());
    }

    #[test]
    fn test_display_message_too_large() {
        let err = ProtoError::MessageTooLarge { size: 1 << 40, max: 1 << 26 };
        assert!(err.to_string().contains("message too large"));
    }
}
