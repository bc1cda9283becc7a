//! Verified byte stream over the packets of one block read.

use std::io::{self, Read, Write};

use byteorder::{BigEndian, ByteOrder};
use dtp_proto::messages::{ClientReadStatusProto, Status};
use dtp_proto::packet::CHECKSUM_SIZE;
use dtp_proto::{write_delimited, PacketHeader, ProtoError};
use tracing::debug;

use crate::checksum::ChecksumKind;
use crate::error::{BlockReadError, BlockReadResult};

/// Outcome of a read that may fail after making progress.
///
/// `bytes` verified bytes were written to the buffer before `error`, if any,
/// occurred. Both can be set at once.
#[derive(Debug)]
pub struct PartialRead {
    pub bytes: usize,
    pub error: Option<BlockReadError>,
}

impl PartialRead {
    fn done(bytes: usize) -> Self {
        Self { bytes, error: None }
    }

    fn failed(bytes: usize, error: BlockReadError) -> Self {
        Self {
            bytes,
            error: Some(error),
        }
    }
}

/// Checksums of the packet being consumed and how much of it is left.
struct PacketCursor {
    checksums: Vec<u32>,
    next_chunk: usize,
    data_left: usize,
    last: bool,
}

/// Reads the packetized data of a block and hands out only bytes whose
/// chunk checksum has been verified.
///
/// Data is pulled one chunk at a time into an internal buffer, checked, and
/// only then copied out, so a corrupted chunk never reaches the caller.
pub struct ChecksummedBlockStream<T> {
    io: T,
    chunk_size: usize,
    checksum: ChecksumKind,
    /// Block offset of the next byte handed out.
    position: u64,
    /// Block offset of the next byte expected on the wire.
    wire_offset: u64,
    packet: Option<PacketCursor>,
    chunk: Vec<u8>,
    chunk_pos: usize,
    finished: bool,
    send_read_status: bool,
    deferred: Option<BlockReadError>,
}

impl<T: Read + Write> ChecksummedBlockStream<T> {
    /// `io` must be positioned at the first packet, which starts at
    /// `chunk_offset` in the block.
    pub fn new(
        io: T,
        bytes_per_checksum: u32,
        checksum: ChecksumKind,
        chunk_offset: u64,
    ) -> BlockReadResult<Self> {
        if bytes_per_checksum == 0 {
            return Err(BlockReadError::InvalidChunkSize(bytes_per_checksum));
        }
        let chunk_size = bytes_per_checksum as usize;
        Ok(Self {
            io,
            chunk_size,
            checksum,
            position: chunk_offset,
            wire_offset: chunk_offset,
            packet: None,
            chunk: Vec::with_capacity(chunk_size),
            chunk_pos: 0,
            finished: false,
            send_read_status: true,
            deferred: None,
        })
    }

    /// Whether to send `CHECKSUM_OK` once the end-of-block packet arrives.
    pub fn with_read_status(mut self, send: bool) -> Self {
        self.send_read_status = send;
        self
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    /// True once the end-of-block packet has been consumed.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Fill `buf` with verified bytes.
    ///
    /// Stops early at the end of the block, on error, or when more data would
    /// need a new packet after some bytes were already copied.
    pub fn read_verified(&mut self, buf: &mut [u8]) -> PartialRead {
        let mut filled = 0;
        while filled < buf.len() {
            if self.chunk_pos == self.chunk.len() {
                let mid_packet = self.packet.as_ref().map_or(false, |p| p.data_left > 0);
                if self.finished || (filled > 0 && !mid_packet) {
                    break;
                }
                match self.next_chunk() {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(err) => return PartialRead::failed(filled, err),
                }
            }

            let available = &self.chunk[self.chunk_pos..];
            let n = available.len().min(buf.len() - filled);
            buf[filled..filled + n].copy_from_slice(&available[..n]);
            self.chunk_pos += n;
            self.position += n as u64;
            filled += n;
        }
        PartialRead::done(filled)
    }

    /// Skip exactly `n` verified bytes.
    pub fn discard(&mut self, mut n: u64) -> BlockReadResult<()> {
        let mut scratch = vec![0u8; n.min(64 * 1024) as usize];
        while n > 0 {
            let want = n.min(scratch.len() as u64) as usize;
            let PartialRead { bytes, error } = self.read_verified(&mut scratch[..want]);
            if let Some(err) = error {
                return Err(err);
            }
            if bytes == 0 {
                return Err(ProtoError::UnexpectedEof.into());
            }
            n -= bytes as u64;
        }
        Ok(())
    }

    /// Consume the rest of the stream up to and including the end-of-block
    /// packet. Data past the current position is verified and dropped.
    pub fn finish(&mut self) -> BlockReadResult<()> {
        let mut dropped = self.chunk.len() - self.chunk_pos;
        self.chunk_pos = self.chunk.len();
        while self.next_chunk()? {
            dropped += self.chunk.len();
            self.chunk_pos = self.chunk.len();
        }
        if dropped > 0 {
            debug!(position = self.position, dropped, "dropped trailing block data");
        }
        Ok(())
    }

    /// Load and verify the next chunk. `Ok(false)` at the end of the block.
    fn next_chunk(&mut self) -> BlockReadResult<bool> {
        loop {
            if self.finished {
                return Ok(false);
            }

            if let Some(packet) = &mut self.packet {
                if packet.data_left > 0 {
                    let len = packet.data_left.min(self.chunk_size);
                    self.chunk.resize(len, 0);
                    self.io.read_exact(&mut self.chunk).map_err(ProtoError::from)?;

                    let expected = packet.checksums[packet.next_chunk];
                    let actual = self.checksum.compute(&self.chunk);
                    if expected != actual {
                        self.chunk.clear();
                        self.chunk_pos = 0;
                        return Err(BlockReadError::ChecksumMismatch {
                            offset: self.wire_offset,
                            expected,
                            actual,
                        });
                    }

                    packet.next_chunk += 1;
                    packet.data_left -= len;
                    self.wire_offset += len as u64;
                    self.chunk_pos = 0;
                    return Ok(true);
                }

                let last = packet.last;
                self.packet = None;
                if last {
                    self.mark_finished();
                    return Ok(false);
                }
            }

            self.next_packet()?;
        }
    }

    fn next_packet(&mut self) -> BlockReadResult<()> {
        let header = PacketHeader::read_from(&mut self.io)?;
        if header.offset_in_block() != self.wire_offset {
            return Err(BlockReadError::UnexpectedPacketOffset {
                expected: self.wire_offset,
                actual: header.offset_in_block(),
            });
        }

        let data_len = header.data_len();
        let expected_chunks = (data_len + self.chunk_size - 1) / self.chunk_size;
        if header.num_checksums() != expected_chunks {
            return Err(BlockReadError::ChecksumCountMismatch {
                expected: expected_chunks,
                actual: header.num_checksums(),
            });
        }

        let mut raw = vec![0u8; header.checksums_len()];
        self.io.read_exact(&mut raw).map_err(ProtoError::from)?;
        let checksums = raw.chunks_exact(CHECKSUM_SIZE).map(BigEndian::read_u32).collect();

        if header.is_end_of_block() {
            self.mark_finished();
        } else {
            self.packet = Some(PacketCursor {
                checksums,
                next_chunk: 0,
                data_left: data_len,
                last: header.header.last_packet_in_block,
            });
        }
        Ok(())
    }

    fn mark_finished(&mut self) {
        self.finished = true;
        if !self.send_read_status {
            return;
        }
        let status = ClientReadStatusProto {
            status: Status::ChecksumOk as i32,
        };
        if let Err(err) = write_delimited(&mut self.io, &status) {
            debug!(error = %err, "could not acknowledge block read");
        }
    }
}

impl<T: Read + Write> Read for ChecksummedBlockStream<T> {
    /// An error after partial progress is held back and returned by the
    /// following call.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Some(err) = self.deferred.take() {
            return Err(err.into());
        }
        match self.read_verified(buf) {
            PartialRead { bytes, error: None } => Ok(bytes),
            PartialRead {
                bytes: 0,
                error: Some(err),
            } => Err(err.into()),
            PartialRead {
                bytes,
                error: Some(err),
            } => {
                self.deferred = Some(err);
                Ok(bytes)
            }
        }
    }
}
