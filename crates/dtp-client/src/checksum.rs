//! Chunk checksum algorithms.

use dtp_proto::messages::ChecksumTypeProto;

use crate::error::BlockReadError;

/// CRC-32 flavour a datanode uses for a block's chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChecksumKind {
    /// IEEE 802.3 polynomial.
    Crc32,
    /// Castagnoli polynomial.
    Crc32c,
}

impl ChecksumKind {
    /// Map the wire enum to an algorithm. `NULL` and unknown values are
    /// rejected.
    pub fn from_proto(raw: i32) -> Result<Self, BlockReadError> {
        match ChecksumTypeProto::try_from(raw) {
            Ok(ChecksumTypeProto::ChecksumCrc32) => Ok(ChecksumKind::Crc32),
            Ok(ChecksumTypeProto::ChecksumCrc32c) => Ok(ChecksumKind::Crc32c),
            Ok(ChecksumTypeProto::ChecksumNull) | Err(_) => {
                Err(BlockReadError::UnsupportedChecksum(raw))
            }
        }
    }

    pub fn to_proto(self) -> ChecksumTypeProto {
        match self {
            ChecksumKind::Crc32 => ChecksumTypeProto::ChecksumCrc32,
            ChecksumKind::Crc32c => ChecksumTypeProto::ChecksumCrc32c,
        }
    }

    pub fn compute(self, data: &[u8]) -> u32 {
        match self {
            ChecksumKind::Crc32 => crc32fast::hash(data),
            ChecksumKind::Crc32c => crc32c::crc32c(data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_values() {
        assert_eq!(ChecksumKind::Crc32.compute(b"123456789"), 0xCBF4_3926);
        assert_eq!(ChecksumKind::Crc32c.compute(b"123456789"), 0xE306_9283);
    }

    #[test]
    fn test_from_proto() {
        assert_eq!(ChecksumKind::from_proto(1).unwrap(), ChecksumKind::Crc32);
        assert_eq!(ChecksumKind::from_proto(2).unwrap(), ChecksumKind::Crc32c);
        assert!(matches!(
            ChecksumKind::from_proto(0),
            Err(BlockReadError::UnsupportedChecksum(0))
        ));
        assert!(matches!(
            ChecksumKind::from_proto(42),
            Err(BlockReadError::UnsupportedChecksum(42))
        ));
    }

    #[test]
    fn test_proto_mapping_is_symmetric() {
        for kind in [ChecksumKind::Crc32, ChecksumKind::Crc32c] {
            assert_eq!(ChecksumKind::from_proto(kind.to_proto() as i32).unwrap(), kind);
        }
    }
}
