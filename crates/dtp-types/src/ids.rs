strong_type!(
    /// Numeric id of a block within its block pool.
    BlockId,
    u64
);
strong_type!(
    /// Generation stamp of a block replica; bumped on every recovery.
    GenerationStamp,
    u64
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_id() {
        let id = BlockId(1_073_741_825);
        assert_eq!(id.get(), 1_073_741_825u64);
        assert_eq!(format!("{:?}", id), "BlockId(1073741825)");
    }

    #[test]
    fn test_generation_stamp_serde() {
        let gs = GenerationStamp(1001);
        let json = serde_json::to_string(&gs).unwrap();
        assert_eq!(json, "1001");
        let parsed: GenerationStamp = serde_json::from_str("1001").unwrap();
        assert_eq!(parsed, gs);
    }
}
