//! Entry point that opens block readers with shared settings.

use std::io::{self, Write};
use std::sync::Arc;

use dtp_types::BlockDescriptor;

use crate::config::BlockReaderConfig;
use crate::error::BlockReadResult;
use crate::failure_cache::{FailureCache, FailureCounts};
use crate::reader::BlockReader;
use crate::socket::{Connector, TcpConnector};

/// Opens [`BlockReader`]s that share a config, a connector and one set of
/// failure counts.
///
/// ```ignore
/// let client = BlockReadClient::new(BlockReaderConfig::default());
/// let bytes = client.read_to_vec(block, 0)?;
/// ```
pub struct BlockReadClient<C: Connector = TcpConnector> {
    config: Arc<BlockReaderConfig>,
    connector: Arc<C>,
    failures: Arc<dyn FailureCounts>,
}

impl BlockReadClient<TcpConnector> {
    /// TCP client recording failures in the process-wide cache.
    pub fn new(config: BlockReaderConfig) -> Self {
        let connector = TcpConnector::from_config(&config);
        Self::with_connector(config, connector, FailureCache::global())
    }
}

impl<C: Connector> BlockReadClient<C> {
    pub fn with_connector(
        config: BlockReaderConfig,
        connector: C,
        failures: Arc<dyn FailureCounts>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            connector: Arc::new(connector),
            failures,
        }
    }

    /// Reader over `block` starting at `offset`. Nothing is dialed until the
    /// first read.
    pub fn open(&self, block: BlockDescriptor, offset: u64) -> BlockReader<C> {
        tracing::debug!(
            block_id = %block.block_id,
            offset,
            replicas = block.locations.len(),
            "opening block reader"
        );
        BlockReader::new(
            block,
            offset,
            Arc::clone(&self.config),
            Arc::clone(&self.connector),
            Arc::clone(&self.failures),
        )
    }

    /// Read `block` from `offset` to its end.
    pub fn read_to_vec(&self, block: BlockDescriptor, offset: u64) -> BlockReadResult<Vec<u8>> {
        let mut out = Vec::with_capacity(block.remaining_from(offset).min(64 << 20) as usize);
        let mut reader = self.open(block, offset);
        let mut buf = vec![0u8; 64 * 1024];
        loop {
            match reader.read_block(&mut buf)? {
                0 => return Ok(out),
                n => out.extend_from_slice(&buf[..n]),
            }
        }
    }

    /// Copy `block` from `offset` to its end into `out`; returns the number
    /// of bytes written.
    pub fn copy_to<W: Write>(&self, block: BlockDescriptor, offset: u64, out: &mut W) -> io::Result<u64> {
        let mut reader = self.open(block, offset);
        io::copy(&mut reader, out)
    }

    pub fn config(&self) -> &BlockReaderConfig {
        &self.config
    }

    pub fn failures(&self) -> &Arc<dyn FailureCounts> {
        &self.failures
    }
}
