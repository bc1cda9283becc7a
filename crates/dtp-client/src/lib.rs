//! Client-side reader for one replicated block.
//!
//! [`BlockReader`] streams the bytes of a block from whichever replica holder
//! answers, verifying every checksummed chunk and failing over to the next
//! datanode when a connection, the protocol, or the data itself goes bad.
//! Failures are remembered in a [`FailureCache`] shared by all readers, so
//! nodes that misbehaved recently are tried last everywhere.
//!
//! ```ignore
//! let client = BlockReadClient::new(BlockReaderConfig::default());
//! let mut reader = client.open(block, 0);
//! std::io::copy(&mut reader, &mut out)?;
//! ```

pub mod checksum;
pub mod client;
pub mod config;
pub mod error;
pub mod failover;
pub mod failure_cache;
pub mod reader;
pub mod socket;
pub mod stream;

#[cfg(test)]
mod test_support;

pub use checksum::ChecksumKind;
pub use client::BlockReadClient;
pub use config::BlockReaderConfig;
pub use error::{BlockReadError, BlockReadResult, ConfigError};
pub use failover::DatanodeFailover;
pub use failure_cache::{FailureCache, FailureCounts, FailureRecord};
pub use reader::{BlockReader, CloseHandle};
pub use socket::{Connector, DataSocket, SocketIo, TcpConnector};
pub use stream::{ChecksummedBlockStream, PartialRead};
