//! Data packet headers.
//!
//! ```text
//! [payload_len: u32 BE][header_len: u16 BE][PacketHeaderProto]
//! [checksums: u32 BE each][data]
//! ```
//!
//! `payload_len` counts itself (4 bytes) plus the checksum and data sections;
//! `header_len` and the header proto are not included.

use std::io::{Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use prost::Message;

use crate::error::ProtoError;
use crate::messages::PacketHeaderProto;

/// Width of the `payload_len` field, which `payload_len` includes.
pub const PAYLOAD_LEN_FIELD: usize = 4;

/// Width of one on-wire checksum.
pub const CHECKSUM_SIZE: usize = 4;

/// Upper bound on checksums + data in one packet.
pub const MAX_PACKET_PAYLOAD: usize = 16 * 1024 * 1024;

/// A parsed packet header; the checksums and data follow on the stream.
#[derive(Debug, Clone, PartialEq)]
pub struct PacketHeader {
    pub payload_len: u32,
    pub header: PacketHeaderProto,
}

impl PacketHeader {
    /// Build a header for a packet carrying `data_len` bytes in `num_chunks`
    /// checksummed chunks.
    pub fn new(offset_in_block: i64, seqno: i64, data_len: usize, num_chunks: usize, last: bool) -> Self {
        Self {
            payload_len: (PAYLOAD_LEN_FIELD + num_chunks * CHECKSUM_SIZE + data_len) as u32,
            header: PacketHeaderProto {
                offset_in_block,
                seqno,
                last_packet_in_block: last,
                data_len: data_len as i32,
                sync_block: None,
            },
        }
    }

    /// Read and validate a header from the stream.
    pub fn read_from<R: Read>(r: &mut R) -> Result<Self, ProtoError> {
        let payload_len = r.read_u32::<BigEndian>()?;
        let header_len = r.read_u16::<BigEndian>()? as usize;

        let mut header_buf = vec![0u8; header_len];
        r.read_exact(&mut header_buf)?;
        let header = PacketHeaderProto::decode(header_buf.as_slice())?;

        let packet = Self {
            payload_len,
            header,
        };
        packet.validate()?;
        Ok(packet)
    }

    /// Serialize the header (not the checksums or data) to `w`.
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<(), ProtoError> {
        let header = self.header.encode_to_vec();
        w.write_u32::<BigEndian>(self.payload_len)?;
        w.write_u16::<BigEndian>(header.len() as u16)?;
        w.write_all(&header)?;
        Ok(())
    }

    fn validate(&self) -> Result<(), ProtoError> {
        if self.header.data_len < 0 {
            return Err(ProtoError::MalformedPacket(format!(
                "negative data length {}",
                self.header.data_len
            )));
        }
        if self.header.offset_in_block < 0 {
            return Err(ProtoError::MalformedPacket(format!(
                "negative block offset {}",
                self.header.offset_in_block
            )));
        }
        let payload_len = self.payload_len as usize;
        if payload_len > MAX_PACKET_PAYLOAD {
            return Err(ProtoError::MalformedPacket(format!(
                "payload of {} bytes exceeds {}",
                payload_len, MAX_PACKET_PAYLOAD
            )));
        }
        if payload_len < PAYLOAD_LEN_FIELD + self.data_len() {
            return Err(ProtoError::MalformedPacket(format!(
                "payload length {} cannot hold {} data bytes",
                payload_len,
                self.data_len()
            )));
        }
        if self.checksums_len() % CHECKSUM_SIZE != 0 {
            return Err(ProtoError::MalformedPacket(format!(
                "checksum section of {} bytes is not a whole number of checksums",
                self.checksums_len()
            )));
        }
        Ok(())
    }

    pub fn data_len(&self) -> usize {
        self.header.data_len.max(0) as usize
    }

    pub fn offset_in_block(&self) -> u64 {
        self.header.offset_in_block.max(0) as u64
    }

    /// Size of the checksum section.
    pub fn checksums_len(&self) -> usize {
        (self.payload_len as usize).saturating_sub(PAYLOAD_LEN_FIELD + self.data_len())
    }

    pub fn num_checksums(&self) -> usize {
        self.checksums_len() / CHECKSUM_SIZE
    }

    /// Whether this is the empty packet that terminates a block.
    pub fn is_end_of_block(&self) -> bool {
        self.header.last_packet_in_block && self.data_len() == 0
    }
}
