//! Datanode data-transfer protocol: messages and framing for block reads.
//!
//! Layout of a read exchange:
//!
//! ```text
//! client -> [version: u16 BE][op: u8][varint len][OpReadBlockProto]
//! server -> [varint len][BlockOpResponseProto]
//!           packet*  (see `packet`)
//! client -> [varint len][ClientReadStatusProto]   (after the last packet)
//! ```

pub mod error;
pub mod framing;
pub mod messages;
pub mod packet;
pub mod varint;

pub use error::ProtoError;
pub use framing::{read_delimited, write_delimited, write_op, Framed};
pub use packet::PacketHeader;

/// Data-transfer protocol version spoken by this client.
pub const DATA_TRANSFER_VERSION: u16 = 28;

/// Op code of a block read.
pub const READ_BLOCK_OP: u8 = 0x51;

/// Largest delimited message accepted from a datanode.
pub const MAX_MESSAGE_LEN: u64 = 64 * 1024 * 1024;
