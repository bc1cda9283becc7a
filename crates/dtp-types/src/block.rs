use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::ids::{BlockId, GenerationStamp};
use crate::location::Location;

/// Access token issued by the naming service for one block.
///
/// Passed through to the datanode untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockToken {
    #[serde(default)]
    pub identifier: Bytes,
    #[serde(default)]
    pub password: Bytes,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub service: String,
}

/// Everything needed to read one replicated block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDescriptor {
    /// Block pool the block belongs to.
    pub pool_id: String,
    pub block_id: BlockId,
    pub generation_stamp: GenerationStamp,
    /// Total length of the block in bytes.
    pub num_bytes: u64,
    #[serde(default)]
    pub token: BlockToken,
    /// Replica holders, in the order the naming service returned them.
    pub locations: Vec<Location>,
}

impl BlockDescriptor {
    /// Bytes left in the block after `offset` (zero past the end).
    pub fn remaining_from(&self, offset: u64) -> u64 {
        self.num_bytes.saturating_sub(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BlockDescriptor {
        BlockDescriptor {
            pool_id: "BP-1-127.0.0.1-1700000000000".into(),
            block_id: BlockId(1_073_741_825),
            generation_stamp: GenerationStamp(1001),
            num_bytes: 4096,
            token: BlockToken::default(),
            locations: vec![
                Location::new("10.0.0.1", 9866),
                Location::new("10.0.0.2", 9866),
            ],
        }
    }

    #[test]
    fn test_remaining_from() {
        let block = sample();
        assert_eq!(block.remaining_from(0), 4096);
        assert_eq!(block.remaining_from(4000), 96);
        assert_eq!(block.remaining_from(4096), 0);
        assert_eq!(block.remaining_from(9000), 0);
    }

    #[test]
    fn test_descriptor_json_without_token() {
        let json = r#"{
            "pool_id": "BP-7",
            "block_id": 42,
            "generation_stamp": 3,
            "num_bytes": 10,
            "locations": [{"host": "dn1", "port": 9866}]
        }"#;
        let block: BlockDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(block.block_id, BlockId(42));
        assert_eq!(block.token, BlockToken::default());
        assert_eq!(block.locations, vec![Location::new("dn1", 9866)]);
    }

    #[test]
    fn test_descriptor_serde_roundtrip() {
        let mut block = sample();
        block.token.identifier = Bytes::from_static(b"ident");
        block.token.kind = "HDFS_BLOCK_TOKEN".into();
        let json = serde_json::to_string(&block).unwrap();
        let parsed: BlockDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, block);
    }
}
