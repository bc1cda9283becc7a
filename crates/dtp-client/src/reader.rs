//! Failover reader for one block.

use std::io::{self, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dtp_proto::messages::{
    BaseHeaderProto, BlockOpResponseProto, ClientOperationHeaderProto, ExtendedBlockProto,
    OpReadBlockProto, Status, TokenProto,
};
use dtp_proto::{read_delimited, write_op, Framed, READ_BLOCK_OP};
use dtp_types::{BlockDescriptor, Location};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::checksum::ChecksumKind;
use crate::config::BlockReaderConfig;
use crate::error::{BlockReadError, BlockReadResult};
use crate::failover::DatanodeFailover;
use crate::failure_cache::FailureCounts;
use crate::socket::{Connector, DataSocket, SocketIo, TcpConnector};
use crate::stream::{ChecksummedBlockStream, PartialRead};

/// An open connection and the verified stream running over it.
///
/// Dropping it shuts the socket down.
struct ActiveStream<S: DataSocket> {
    socket: Arc<S>,
    stream: ChecksummedBlockStream<SocketIo<S>>,
    datanode: Location,
}

impl<S: DataSocket> Drop for ActiveStream<S> {
    fn drop(&mut self) {
        self.socket.shutdown();
    }
}

enum ReaderState<S: DataSocket> {
    /// No connection; the next read dials the best remaining datanode.
    Idle,
    Streaming(ActiveStream<S>),
    /// Every datanode failed.
    Exhausted,
    Closed,
}

/// Close flag plus the socket to shut when it is raised.
struct CloseSignal<S> {
    closed: AtomicBool,
    socket: Mutex<Option<Arc<S>>>,
}

impl<S: DataSocket> CloseSignal<S> {
    fn new() -> Self {
        Self {
            closed: AtomicBool::new(false),
            socket: Mutex::new(None),
        }
    }

    fn attach(&self, socket: &Arc<S>) {
        let mut slot = self.socket.lock();
        if self.is_closed() {
            socket.shutdown();
        }
        *slot = Some(Arc::clone(socket));
    }

    fn detach(&self) {
        self.socket.lock().take();
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

trait Closer: Send + Sync {
    fn close(&self);
}

impl<S: DataSocket> Closer for CloseSignal<S> {
    fn close(&self) {
        let mut slot = self.socket.lock();
        self.closed.store(true, Ordering::Release);
        if let Some(socket) = slot.take() {
            socket.shutdown();
        }
    }
}

/// Closes a [`BlockReader`] from another thread.
///
/// A read blocked on the network returns promptly once the handle fires.
#[derive(Clone)]
pub struct CloseHandle {
    signal: Arc<dyn Closer>,
}

impl CloseHandle {
    pub fn close(&self) {
        self.signal.close();
    }
}

impl std::fmt::Debug for CloseHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloseHandle").finish_non_exhaustive()
    }
}

/// Reads a block from its replicas, starting at a given offset.
///
/// One datanode streams at a time. When it fails (refused dial, bad response,
/// checksum mismatch, dropped connection) the failure is charged to it in the
/// shared failure counts and the reader resumes from its current offset on
/// the next best datanode. Each datanode is tried at most once per reader.
/// Bytes already verified are always returned before an error is reported.
pub struct BlockReader<C: Connector = TcpConnector> {
    block: BlockDescriptor,
    config: Arc<BlockReaderConfig>,
    connector: Arc<C>,
    datanodes: DatanodeFailover,
    state: ReaderState<C::Socket>,
    offset: u64,
    signal: Arc<CloseSignal<C::Socket>>,
}

impl<C: Connector> BlockReader<C> {
    pub fn new(
        block: BlockDescriptor,
        offset: u64,
        config: Arc<BlockReaderConfig>,
        connector: Arc<C>,
        failures: Arc<dyn FailureCounts>,
    ) -> Self {
        let datanodes = DatanodeFailover::new(&block.locations, failures);
        Self {
            block,
            config,
            connector,
            datanodes,
            state: ReaderState::Idle,
            offset,
            signal: Arc::new(CloseSignal::new()),
        }
    }

    /// Read verified block bytes into `buf`.
    ///
    /// `Ok(0)` means the end of the block was reached (the reader closes
    /// itself) or `buf` was empty. Once every datanode has failed, this and
    /// all later calls return the last datanode error.
    pub fn read_block(&mut self, buf: &mut [u8]) -> BlockReadResult<usize> {
        if self.signal.is_closed() {
            self.close();
        }
        match self.state {
            ReaderState::Closed => return Err(BlockReadError::Closed),
            ReaderState::Exhausted => return Err(self.exhausted_error()),
            ReaderState::Idle | ReaderState::Streaming(_) => {}
        }

        let remaining = self.block.remaining_from(self.offset);
        if remaining == 0 {
            self.finish_stream();
            self.close();
            return Ok(0);
        }
        if buf.is_empty() {
            return Ok(0);
        }
        let len = usize::try_from(remaining).map_or(buf.len(), |r| r.min(buf.len()));
        let buf = &mut buf[..len];

        loop {
            if let ReaderState::Streaming(active) = &mut self.state {
                // A clean end-of-block packet ends the read here, even short
                // of the block length.
                let PartialRead { bytes, error } = active.stream.read_verified(buf);
                self.offset += bytes as u64;

                let Some(err) = error else {
                    return Ok(bytes);
                };
                self.drop_stream();
                if self.signal.is_closed() {
                    self.close();
                    return if bytes > 0 { Ok(bytes) } else { Err(BlockReadError::Closed) };
                }
                warn!(
                    block_id = %self.block.block_id,
                    datanode = ?self.datanodes.current(),
                    offset = self.offset,
                    error = %err,
                    "block read failed, failing over"
                );
                self.datanodes.record_failure(err);
                if bytes > 0 {
                    return Ok(bytes);
                }
            }

            match self.connect_next() {
                Some(active) => self.state = ReaderState::Streaming(active),
                None if self.signal.is_closed() => {
                    self.close();
                    return Err(BlockReadError::Closed);
                }
                None => {
                    self.state = ReaderState::Exhausted;
                    return Err(self.exhausted_error());
                }
            }
        }
    }

    /// Close the reader and its connection. Idempotent.
    pub fn close(&mut self) {
        if matches!(self.state, ReaderState::Closed) {
            return;
        }
        self.signal.close();
        self.state = ReaderState::Closed;
        debug!(block_id = %self.block.block_id, offset = self.offset, "block reader closed");
    }

    pub fn close_handle(&self) -> CloseHandle {
        CloseHandle {
            signal: self.signal.clone(),
        }
    }

    /// Block offset of the next byte to be returned.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn block(&self) -> &BlockDescriptor {
        &self.block
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, ReaderState::Closed) || self.signal.is_closed()
    }

    fn exhausted_error(&self) -> BlockReadError {
        self.datanodes
            .last_error()
            .cloned()
            .unwrap_or(BlockReadError::NoDatanodes(self.block.block_id))
    }

    fn drop_stream(&mut self) {
        self.signal.detach();
        self.state = ReaderState::Idle;
    }

    /// Consume the end-of-block packet so the datanode gets its
    /// acknowledgement. Best effort: the wait is bounded by `drain_timeout`.
    fn finish_stream(&mut self) {
        let ReaderState::Streaming(active) = &mut self.state else {
            return;
        };
        if active.stream.is_finished() || !self.config.send_read_status {
            return;
        }
        let drained = active
            .socket
            .set_read_timeout(Some(self.config.drain_timeout))
            .map_err(BlockReadError::from)
            .and_then(|()| active.stream.finish());
        if let Err(err) = drained {
            debug!(
                block_id = %self.block.block_id,
                datanode = %active.datanode,
                error = %err,
                "could not drain end of block"
            );
        }
    }

    /// Dial datanodes best-first until one yields a stream positioned at the
    /// current offset. `None` once none are left or the reader was closed.
    fn connect_next(&mut self) -> Option<ActiveStream<C::Socket>> {
        while !self.signal.is_closed() {
            let datanode = self.datanodes.next().ok()?;
            match self.open_stream(&datanode) {
                Ok(active) => return Some(active),
                Err(err) => {
                    if self.signal.is_closed() {
                        return None;
                    }
                    warn!(
                        block_id = %self.block.block_id,
                        datanode = %datanode,
                        offset = self.offset,
                        error = %err,
                        "could not start block read"
                    );
                    self.datanodes.record_failure(err);
                }
            }
        }
        None
    }

    fn open_stream(&self, datanode: &Location) -> BlockReadResult<ActiveStream<C::Socket>> {
        debug!(
            block_id = %self.block.block_id,
            datanode = %datanode,
            offset = self.offset,
            "connecting to datanode"
        );
        let socket = Arc::new(self.connector.connect(datanode, self.config.connect_timeout)?);
        self.signal.attach(&socket);

        match self.start_stream(SocketIo::new(Arc::clone(&socket))) {
            Ok(stream) => Ok(ActiveStream {
                socket,
                stream,
                datanode: datanode.clone(),
            }),
            Err(err) => {
                self.signal.detach();
                socket.shutdown();
                Err(err)
            }
        }
    }

    /// Send the read request and position the stream at `self.offset`.
    fn start_stream(
        &self,
        mut io: SocketIo<C::Socket>,
    ) -> BlockReadResult<ChecksummedBlockStream<SocketIo<C::Socket>>> {
        write_op(&mut io, READ_BLOCK_OP, &self.read_request())?;
        let Framed {
            message: response,
            surplus,
        } = read_delimited::<_, BlockOpResponseProto>(&mut io)?;
        io.unread(surplus);

        if response.status != Status::Success as i32 {
            return Err(BlockReadError::OpFailed {
                status: status_name(response.status),
                message: response.message.unwrap_or_default(),
            });
        }
        let info = response
            .read_op_checksum_info
            .ok_or(BlockReadError::MissingChecksumInfo)?;
        let kind = ChecksumKind::from_proto(info.checksum.r#type)?;
        if info.chunk_offset > self.offset {
            return Err(BlockReadError::InvalidChunkOffset {
                chunk_offset: info.chunk_offset,
                requested: self.offset,
            });
        }

        let mut stream = ChecksummedBlockStream::new(
            io,
            info.checksum.bytes_per_checksum,
            kind,
            info.chunk_offset,
        )?
        .with_read_status(self.config.send_read_status);

        let skip = self.offset - info.chunk_offset;
        if skip > 0 {
            debug!(block_id = %self.block.block_id, skip, "skipping to requested offset");
            stream.discard(skip)?;
        }
        Ok(stream)
    }

    fn read_request(&self) -> OpReadBlockProto {
        let block = &self.block;
        OpReadBlockProto {
            header: ClientOperationHeaderProto {
                base_header: BaseHeaderProto {
                    block: ExtendedBlockProto {
                        pool_id: block.pool_id.clone(),
                        block_id: block.block_id.get(),
                        generation_stamp: block.generation_stamp.get(),
                        num_bytes: Some(block.num_bytes),
                    },
                    token: Some(TokenProto {
                        identifier: block.token.identifier.to_vec(),
                        password: block.token.password.to_vec(),
                        kind: block.token.kind.clone(),
                        service: block.token.service.clone(),
                    }),
                },
                client_name: self.config.client_name.clone(),
            },
            offset: self.offset,
            len: block.remaining_from(self.offset),
            send_checksums: Some(true),
        }
    }
}

fn status_name(raw: i32) -> String {
    match Status::try_from(raw) {
        Ok(status) => format!("{:?}", status),
        Err(_) => format!("unknown status {}", raw),
    }
}

impl<C: Connector> Drop for BlockReader<C> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<C: Connector> Read for BlockReader<C> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_block(buf).map_err(io::Error::from)
    }
}
