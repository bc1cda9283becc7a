//! Doubles and wire encoders shared by the client tests.

use std::collections::HashMap;
use std::io::{self, Cursor, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use byteorder::{BigEndian, WriteBytesExt};
use dtp_proto::framing::put_delimited;
use dtp_proto::messages::{BlockOpResponseProto, ChecksumProto, ReadOpChecksumInfoProto, Status};
use dtp_proto::PacketHeader;
use dtp_types::{BlockDescriptor, BlockId, BlockToken, GenerationStamp, Location};
use parking_lot::Mutex;

use crate::checksum::ChecksumKind;
use crate::failure_cache::FailureCounts;
use crate::socket::{Connector, DataSocket};

pub fn dn(n: u8) -> Location {
    Location::new(format!("10.0.0.{}", n), 9866)
}

/// Deterministic, non-trivial block content.
pub fn block_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 + 7) as u8).collect()
}

pub fn test_block(num_bytes: u64, locations: Vec<Location>) -> BlockDescriptor {
    BlockDescriptor {
        pool_id: "BP-test".into(),
        block_id: BlockId(1073741825),
        generation_stamp: GenerationStamp(1001),
        num_bytes,
        token: BlockToken::default(),
        locations,
    }
}

/// [`FailureCounts`] seeded with fixed counts; recorded failures add on top.
pub struct FixedCounts {
    counts: Mutex<HashMap<Location, u64>>,
}

impl FixedCounts {
    pub fn new(seed: &[(Location, u64)]) -> Self {
        Self {
            counts: Mutex::new(seed.iter().cloned().collect()),
        }
    }
}

impl FailureCounts for FixedCounts {
    fn record_failure(&self, location: &Location) {
        *self.counts.lock().entry(location.clone()).or_insert(0) += 1;
    }

    fn failure_count(&self, location: &Location) -> u64 {
        self.counts.lock().get(location).copied().unwrap_or(0)
    }
}

pub fn success_response(kind: ChecksumKind, chunk_size: u32, chunk_offset: u64) -> Vec<u8> {
    let response = BlockOpResponseProto {
        status: Status::Success as i32,
        first_bad_link: None,
        read_op_checksum_info: Some(ReadOpChecksumInfoProto {
            checksum: ChecksumProto {
                r#type: kind.to_proto() as i32,
                bytes_per_checksum: chunk_size,
            },
            chunk_offset,
        }),
        message: None,
    };
    let mut out = Vec::new();
    put_delimited(&mut out, &response);
    out
}

pub fn encode_response(response: &BlockOpResponseProto) -> Vec<u8> {
    let mut out = Vec::new();
    put_delimited(&mut out, response);
    out
}

/// Data packets for `data`, whose first byte sits at block offset `start`.
/// No end-of-block packet is appended.
pub fn encode_packets(
    data: &[u8],
    start: u64,
    chunk_size: usize,
    kind: ChecksumKind,
    chunks_per_packet: usize,
) -> Vec<u8> {
    let mut out = Vec::new();
    let mut offset = start;
    for (seqno, packet) in data.chunks(chunk_size * chunks_per_packet).enumerate() {
        let chunks: Vec<&[u8]> = packet.chunks(chunk_size).collect();
        let header = PacketHeader::new(offset as i64, seqno as i64, packet.len(), chunks.len(), false);
        header.write_to(&mut out).unwrap();
        for chunk in &chunks {
            out.write_u32::<BigEndian>(kind.compute(chunk)).unwrap();
        }
        out.extend_from_slice(packet);
        offset += packet.len() as u64;
    }
    out
}

pub fn end_packet(offset: u64) -> Vec<u8> {
    let mut out = Vec::new();
    PacketHeader::new(offset as i64, 0, 0, 0, true)
        .write_to(&mut out)
        .unwrap();
    out
}

pub fn encode_block_stream(
    data: &[u8],
    start: u64,
    chunk_size: usize,
    kind: ChecksumKind,
    chunks_per_packet: usize,
) -> Vec<u8> {
    let mut out = encode_packets(data, start, chunk_size, kind, chunks_per_packet);
    out.extend(end_packet(start + data.len() as u64));
    out
}

/// A full datanode reply: response, data packets from `start`, end packet.
pub fn serve_block(block: &[u8], start: u64, chunk_size: usize, kind: ChecksumKind) -> Vec<u8> {
    let mut out = success_response(kind, chunk_size as u32, start);
    out.extend(encode_block_stream(&block[start as usize..], start, chunk_size, kind, 2));
    out
}

/// In-memory socket: reads come from a fixed buffer, writes are captured.
pub struct MemorySocket {
    inbound: Mutex<Cursor<Vec<u8>>>,
    sent: Arc<Mutex<Vec<u8>>>,
    shut: AtomicBool,
}

impl MemorySocket {
    pub fn new(inbound: Vec<u8>) -> Self {
        Self::with_sent(inbound, Arc::new(Mutex::new(Vec::new())))
    }

    pub fn with_sent(inbound: Vec<u8>, sent: Arc<Mutex<Vec<u8>>>) -> Self {
        Self {
            inbound: Mutex::new(Cursor::new(inbound)),
            sent,
            shut: AtomicBool::new(false),
        }
    }

    pub fn sent(&self) -> Vec<u8> {
        self.sent.lock().clone()
    }

    pub fn is_shutdown(&self) -> bool {
        self.shut.load(Ordering::SeqCst)
    }
}

impl DataSocket for MemorySocket {
    fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        if self.is_shutdown() {
            return Ok(0);
        }
        self.inbound.lock().read(buf)
    }

    fn send(&self, data: &[u8]) -> io::Result<()> {
        if self.is_shutdown() {
            return Err(io::ErrorKind::BrokenPipe.into());
        }
        self.sent.lock().extend_from_slice(data);
        Ok(())
    }

    fn set_read_timeout(&self, _timeout: Option<Duration>) -> io::Result<()> {
        Ok(())
    }

    fn shutdown(&self) {
        self.shut.store(true, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone)]
pub enum Script {
    Refuse,
    Serve(Vec<u8>),
}

/// [`Connector`] that answers each datanode from a fixed script and logs
/// every dial. Unscripted datanodes refuse.
#[derive(Default)]
pub struct ScriptedConnector {
    scripts: HashMap<Location, Script>,
    dials: Mutex<Vec<Location>>,
    sent: Mutex<HashMap<Location, Arc<Mutex<Vec<u8>>>>>,
}

impl ScriptedConnector {
    pub fn new(scripts: Vec<(Location, Script)>) -> Self {
        Self {
            scripts: scripts.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn dials(&self) -> Vec<Location> {
        self.dials.lock().clone()
    }

    /// Everything written to `location` across all its connections.
    pub fn sent_to(&self, location: &Location) -> Vec<u8> {
        self.sent
            .lock()
            .get(location)
            .map(|sent| sent.lock().clone())
            .unwrap_or_default()
    }
}

impl Connector for ScriptedConnector {
    type Socket = MemorySocket;

    fn connect(&self, location: &Location, _timeout: Duration) -> io::Result<MemorySocket> {
        self.dials.lock().push(location.clone());
        match self.scripts.get(location) {
            Some(Script::Serve(data)) => {
                let sent = Arc::clone(self.sent.lock().entry(location.clone()).or_default());
                Ok(MemorySocket::with_sent(data.clone(), sent))
            }
            Some(Script::Refuse) | None => Err(io::ErrorKind::ConnectionRefused.into()),
        }
    }
}
